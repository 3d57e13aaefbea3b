use anyhow::anyhow;
use pramaan_core::config::LoggingConfig;
use pramaan_core::LogFormat;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| anyhow!("invalid log filter '{}': {e}", config.filter))?;

    match config.format {
        LogFormat::Json => {
            let subscriber = Registry::default()
                .with(filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new("pramaan".into(), std::io::stdout));
            tracing::subscriber::set_global_default(subscriber)
                .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
        }
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow!("failed to install tracing subscriber: {e}")),
    }
}
