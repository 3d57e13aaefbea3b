mod commands;
mod error;
mod handlers;
mod routes;
mod state;
mod telemetry;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pramaan_core::PramaanConfig;
use pramaan_import::ReportStyle;
use tracing::info;

use crate::state::AppState;

/// Certificate verification service: OCR field extraction, canonical
/// hashing, and comparison against issued-certificate records.
#[derive(Parser, Debug)]
#[command(name = "pramaan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: per-user config dir, then built-in defaults)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Extract fields from a scan (or a .txt of OCR lines) and print the digest
    Extract {
        #[arg(long, short = 'i')]
        input: PathBuf,
    },
    /// Run the full verification pipeline on one file
    Verify {
        #[arg(long, short = 'i')]
        input: PathBuf,
    },
    /// Register a roster of issued certificates in the local registry
    Import {
        #[arg(long, short = 'f')]
        file: PathBuf,
        #[arg(long, default_value = "ledger", value_parser = ["ledger", "registrar"])]
        profile: String,
        /// Recorded as the issuer of every imported row
        #[arg(long)]
        issuer: Option<String>,
    },
    /// Verify every row of a roster and write a report
    BatchVerify {
        #[arg(long, short = 'f')]
        file: PathBuf,
        #[arg(long, default_value = "ledger", value_parser = ["ledger", "registrar"])]
        profile: String,
        /// summary, detailed, or json-only
        #[arg(long, default_value = "summary")]
        report: ReportStyle,
        /// Directory for report files
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// List registered certificates
    Registry {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PramaanConfig::load(cli.config.as_deref())?;
    telemetry::init(&config.logging)?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Extract { input } => commands::extract(&config, &input).await,
        Command::Verify { input } => commands::verify(&config, &input).await,
        Command::Import { file, profile, issuer } => {
            commands::import(&config, &file, &profile, issuer.as_deref()).await
        }
        Command::BatchVerify { file, profile, report, out } => {
            commands::batch_verify(&config, &file, &profile, report, &out).await
        }
        Command::Registry { limit } => commands::registry(&config, limit).await,
    }
}

async fn serve(config: PramaanConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).await?;
    info!(
        "Hash scheme {}, comparison backend {}",
        state.pipeline.scheme(),
        state.pipeline.backend_name()
    );
    let app = routes::router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
