//! Offline subcommands: everything except `serve`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Utc;
use pramaan_core::{Field, PramaanConfig};
use pramaan_import::{import_roster, verify_roster, BatchReport, ReportStyle, RosterProfile};
use pramaan_storage::{count_issued, create_db, insert_issued, list_issued, NewIssued};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::state::{build_backend, AppState};

fn roster_profile(name: &str) -> anyhow::Result<RosterProfile> {
    RosterProfile::by_name(name).with_context(|| format!("unknown roster profile '{name}'"))
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn is_text_input(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("txt"))
}

/// Extract and hash without asking any backend. `.txt` inputs are taken as
/// already-recognized lines; anything else goes through OCR.
pub async fn extract(config: &PramaanConfig, input: &Path) -> anyhow::Result<()> {
    let data = read_input(input)?;
    let state = AppState::from_config(config).await?;
    let pipeline = &state.pipeline;

    let lines = if is_text_input(input) {
        pramaan_core::OcrLines::from_text(&String::from_utf8_lossy(&data))
    } else {
        pipeline.recognize(&data)?
    };
    let record = pipeline.extractor().extract_lines(&lines);
    let hash = pipeline.scheme().digest(&record);

    let out = json!({
        "extracted_data": record,
        "hash": hash,
        "scheme": pipeline.scheme().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Full pipeline on one file, printing the verification report.
pub async fn verify(config: &PramaanConfig, input: &Path) -> anyhow::Result<()> {
    let data = read_input(input)?;
    let state = AppState::from_config(config).await?;

    let report = if is_text_input(input) {
        let lines = pramaan_core::OcrLines::from_text(&String::from_utf8_lossy(&data));
        let record = state.pipeline.extractor().extract_lines(&lines);
        state
            .pipeline
            .verify_record(Uuid::new_v4(), pramaan_core::sha256_hex(&data), record)
            .await
    } else {
        state.pipeline.process_bytes(&data).await?
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Register every roster row's digest in the local registry.
pub async fn import(
    config: &PramaanConfig,
    file: &Path,
    profile: &str,
    issuer: Option<&str>,
) -> anyhow::Result<()> {
    let profile = roster_profile(profile)?;
    let reader = std::fs::File::open(file)
        .with_context(|| format!("failed to open roster {}", file.display()))?;
    let entries = import_roster(reader, &profile, &config.hashing)?;

    let path = config.database_path();
    let pool = create_db(&path)
        .await
        .with_context(|| format!("failed to open registry {}", path.display()))?;

    let scheme = config.hashing.to_string();
    let mut inserted = 0;
    for entry in &entries {
        let new = NewIssued { digest: &entry.digest, scheme: &scheme, record: &entry.record, issuer };
        if insert_issued(&pool, &new).await? {
            inserted += 1;
        } else {
            info!("Row {} already registered ({})", entry.line, &entry.digest[..12]);
        }
    }

    let total = count_issued(&pool).await?;
    println!(
        "Imported {inserted} of {} rows from {} into {} ({total} certificates registered)",
        entries.len(),
        file.display(),
        path.display()
    );
    Ok(())
}

pub async fn batch_verify(
    config: &PramaanConfig,
    file: &Path,
    profile: &str,
    style: ReportStyle,
    out: &Path,
) -> anyhow::Result<()> {
    if !file.exists() {
        bail!("CSV file not found: {}", file.display());
    }
    let profile = roster_profile(profile)?;
    let reader = std::fs::File::open(file)
        .with_context(|| format!("failed to open roster {}", file.display()))?;
    let entries = import_roster(reader, &profile, &config.hashing)?;
    let backend = build_backend(config).await?;

    let report = verify_roster(&entries, backend.as_ref(), &file.display().to_string()).await;
    if style != ReportStyle::JsonOnly {
        print_report(&report, style);
    }

    for path in report.write(out, style, Utc::now())? {
        println!("Report saved: {}", path.display());
    }
    Ok(())
}

fn print_report(report: &BatchReport, style: ReportStyle) {
    let total = report.metadata.total_processed;
    for c in &report.certificates {
        let holder = c.fields.display_value(Field::HolderName);
        let university = c.fields.display_value(Field::UniversityName);
        let outcome = match (&c.error, c.is_valid) {
            (Some(e), _) => format!("ERROR ({e})"),
            (None, true) => "VALID".to_string(),
            (None, false) => "NOT FOUND".to_string(),
        };
        println!("[{}/{total}] {holder} ({university}) - {outcome}", c.index);

        if style == ReportStyle::Detailed {
            println!(
                "    {} | Grade: {}",
                c.fields.display_value(Field::Course),
                c.fields.display_value(Field::Grade)
            );
            if let Some(issuer) = &c.issuer {
                println!("    Issuer: {issuer}");
            }
            println!("    Hash: {}", c.hash);
        }
    }

    let m = &report.metadata;
    println!();
    println!("File: {}", m.csv_file);
    println!("Total processed: {}", m.total_processed);
    println!("Valid: {} ({}%)", m.valid_count, m.success_rate);
    println!("Invalid: {}", m.invalid_count);
    println!("Processing time: {} ms", m.processing_time_ms);
}

pub async fn registry(config: &PramaanConfig, limit: i64) -> anyhow::Result<()> {
    let path: PathBuf = config.database_path();
    let pool = create_db(&path).await?;
    let total = count_issued(&pool).await?;
    println!("{} ({total} certificates)", path.display());

    for row in list_issued(&pool, limit).await? {
        println!(
            "{}  {:<12}  {}  {}",
            row.digest,
            row.scheme,
            row.holder_name.as_deref().unwrap_or("N/A"),
            row.issued_at
        );
    }
    Ok(())
}
