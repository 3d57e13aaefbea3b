use crate::roster::{ImportError, RosterEntry};
use chrono::{DateTime, Utc};
use pramaan_core::{ComparisonBackend, Field, FieldRecord, VerificationStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How much the batch run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStyle {
    /// One log line per certificate, JSON report on disk.
    #[default]
    Summary,
    /// Per-certificate detail plus a CSV summary next to the JSON report.
    Detailed,
    /// JSON report only, no per-certificate output.
    JsonOnly,
}

impl fmt::Display for ReportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportStyle::Summary => write!(f, "summary"),
            ReportStyle::Detailed => write!(f, "detailed"),
            ReportStyle::JsonOnly => write!(f, "json-only"),
        }
    }
}

impl FromStr for ReportStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ReportStyle::Summary),
            "detailed" => Ok(ReportStyle::Detailed),
            "json-only" => Ok(ReportStyle::JsonOnly),
            other => Err(format!("unknown report style '{other}' (summary, detailed, json-only)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMetadata {
    pub csv_file: String,
    pub backend: String,
    pub total_processed: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    /// Percentage of valid rows, two decimals.
    pub success_rate: f64,
    pub verification_date: DateTime<Utc>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateResult {
    pub index: usize,
    pub fields: FieldRecord,
    pub hash: String,
    pub short_hash: String,
    pub is_valid: bool,
    pub status: VerificationStatus,
    pub timestamp: Option<String>,
    pub issuer: Option<String>,
    /// Backend failure for this row, if any. Such rows count as invalid.
    pub error: Option<String>,
    pub verification_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub metadata: BatchMetadata,
    pub certificates: Vec<CertificateResult>,
}

fn short_hash(digest: &str) -> String {
    let prefix: String = digest.chars().take(12).collect();
    format!("{prefix}...")
}

fn success_rate(valid: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((valid as f64 / total as f64) * 10_000.0).round() / 100.0
}

/// Check every roster entry against `backend`, sequentially.
pub async fn verify_roster(
    entries: &[RosterEntry],
    backend: &dyn ComparisonBackend,
    csv_file: &str,
) -> BatchReport {
    let started = Instant::now();
    let total = entries.len();
    let mut certificates = Vec::with_capacity(total);
    let mut valid_count = 0;

    for (i, entry) in entries.iter().enumerate() {
        let holder = entry.record.display_value(Field::HolderName);
        let result = backend.compare(&entry.digest, &entry.record).await;

        let (is_valid, timestamp, issuer, error) = match result {
            Ok(c) => (c.is_valid, c.timestamp, c.issuer, None),
            Err(e) => {
                warn!("Error verifying row {} ({holder}): {e}", entry.line);
                (false, None, None, Some(e.to_string()))
            }
        };

        if is_valid {
            valid_count += 1;
        }
        debug!(
            "[{}/{total}] {holder} ({}) - {}",
            i + 1,
            entry.record.display_value(Field::UniversityName),
            if is_valid { "VALID" } else { "NOT FOUND" }
        );

        certificates.push(CertificateResult {
            index: i + 1,
            fields: entry.record.clone(),
            hash: entry.digest.clone(),
            short_hash: short_hash(&entry.digest),
            is_valid,
            status: if is_valid { VerificationStatus::Valid } else { VerificationStatus::Invalid },
            timestamp,
            issuer,
            error,
            verification_time: Utc::now(),
        });
    }

    let metadata = BatchMetadata {
        csv_file: csv_file.to_string(),
        backend: backend.name().to_string(),
        total_processed: total,
        valid_count,
        invalid_count: total - valid_count,
        success_rate: success_rate(valid_count, total),
        verification_date: Utc::now(),
        processing_time_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        "Verified {total} certificates from {csv_file}: {valid_count} valid ({}%)",
        metadata.success_rate
    );

    BatchReport { metadata, certificates }
}

const SUMMARY_HEADER: [&str; 10] = [
    "Name",
    "University",
    "Roll Number",
    "Certificate ID",
    "Degree Name",
    "Grade",
    "Status",
    "Hash",
    "Timestamp",
    "Issuer",
];

impl BatchReport {
    /// Write the JSON report (and the CSV summary for [`ReportStyle::Detailed`])
    /// into `dir`. Returns the written paths.
    pub fn write(
        &self,
        dir: &Path,
        style: ReportStyle,
        at: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, ImportError> {
        std::fs::create_dir_all(dir)?;
        let stamp = at.format("%Y-%m-%dT%H-%M-%S");
        let mut written = Vec::new();

        let json_path = dir.join(format!("verification_report_{stamp}.json"));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ImportError::Report(e.to_string()))?;
        std::fs::write(&json_path, json)?;
        written.push(json_path);

        if style == ReportStyle::Detailed {
            let csv_path = dir.join(format!("verification_summary_{stamp}.csv"));
            self.write_summary_csv(&csv_path)?;
            written.push(csv_path);
        }

        Ok(written)
    }

    fn write_summary_csv(&self, path: &Path) -> Result<(), ImportError> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_path(path)?;
        writer.write_record(SUMMARY_HEADER)?;

        for c in &self.certificates {
            let r = &c.fields;
            let status = c.status.to_string();
            writer.write_record([
                r.display_value(Field::HolderName),
                r.display_value(Field::UniversityName),
                r.display_value(Field::RollNo),
                r.display_value(Field::CertificateId),
                r.display_value(Field::Course),
                r.display_value(Field::Grade),
                status.as_str(),
                c.hash.as_str(),
                c.timestamp.as_deref().unwrap_or("N/A"),
                c.issuer.as_deref().unwrap_or("N/A"),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{import_roster, RosterProfile};
    use async_trait::async_trait;
    use pramaan_core::{BackendError, Comparison, HashScheme};
    use std::collections::HashSet;

    const ROSTER: &str = "\
Name,University,Roll Number,Certificate ID,Degree Name,Grade
Jane Doe,ABC University,42,CERT-001,B.Tech,A
John Roe,XYZ University,7,CERT-002,B.Sc,B
Ann Poe,ABC University,9,CERT-003,M.Sc,A
";

    struct Issued {
        digests: HashSet<String>,
        broken: Option<String>,
    }

    #[async_trait]
    impl ComparisonBackend for Issued {
        fn name(&self) -> &'static str {
            "issued-set"
        }

        async fn compare(&self, digest: &str, _: &FieldRecord) -> Result<Comparison, BackendError> {
            if self.broken.as_deref() == Some(digest) {
                return Err(BackendError::Unreachable("connection reset".into()));
            }
            if self.digests.contains(digest) {
                Ok(Comparison::found(Some("0xissuer".into()), Some("1700000000".into())))
            } else {
                Ok(Comparison::not_found())
            }
        }
    }

    fn entries() -> Vec<RosterEntry> {
        import_roster(ROSTER.as_bytes(), &RosterProfile::registrar(), &HashScheme::default())
            .unwrap()
    }

    #[tokio::test]
    async fn counts_valid_invalid_and_errors() {
        let entries = entries();
        let backend = Issued {
            digests: [entries[0].digest.clone()].into_iter().collect(),
            broken: Some(entries[2].digest.clone()),
        };

        let report = verify_roster(&entries, &backend, "roster.csv").await;
        let m = &report.metadata;
        assert_eq!(m.total_processed, 3);
        assert_eq!(m.valid_count, 1);
        assert_eq!(m.invalid_count, 2);
        assert_eq!(m.success_rate, 33.33);
        assert_eq!(m.backend, "issued-set");

        let first = &report.certificates[0];
        assert!(first.is_valid);
        assert_eq!(first.issuer.as_deref(), Some("0xissuer"));
        assert_eq!(first.short_hash.len(), 15);

        let broken = &report.certificates[2];
        assert!(!broken.is_valid);
        assert_eq!(broken.status, VerificationStatus::Invalid);
        assert!(broken.error.as_deref().unwrap().contains("connection reset"));
    }

    #[test]
    fn report_style_parses() {
        assert_eq!("json-only".parse::<ReportStyle>(), Ok(ReportStyle::JsonOnly));
        assert_eq!(ReportStyle::Detailed.to_string(), "detailed");
        assert!("verbose".parse::<ReportStyle>().is_err());
    }

    #[test]
    fn success_rate_rounds_and_handles_empty() {
        assert_eq!(success_rate(2, 3), 66.67);
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(5, 5), 100.0);
    }

    #[tokio::test]
    async fn detailed_style_writes_csv_summary() {
        let entries = entries();
        let backend = Issued {
            digests: entries.iter().map(|e| e.digest.clone()).collect(),
            broken: None,
        };
        let report = verify_roster(&entries, &backend, "roster.csv").await;

        let dir = tempfile::tempdir().unwrap();
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:20:30Z").unwrap().with_timezone(&Utc);
        let paths = report.write(dir.path(), ReportStyle::Detailed, at).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("verification_report_2026-03-01T10-20-30.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths[0]).unwrap()).unwrap();
        assert_eq!(json["metadata"]["valid_count"], 3);
        assert_eq!(json["certificates"][0]["fields"]["holder_name"], "Jane Doe");

        let csv = std::fs::read_to_string(&paths[1]).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("\"Name\",\"University\""));
        let row = lines.next().unwrap();
        assert!(row.starts_with("\"Jane Doe\",\"ABC University\",\"42\",\"CERT-001\",\"B.Tech\",\"A\",\"VALID\""));
    }

    #[tokio::test]
    async fn summary_style_writes_json_only() {
        let entries = entries();
        let backend = Issued { digests: HashSet::new(), broken: None };
        let report = verify_roster(&entries, &backend, "roster.csv").await;

        let dir = tempfile::tempdir().unwrap();
        let paths = report.write(dir.path(), ReportStyle::Summary, Utc::now()).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(report.metadata.success_rate, 0.0);
    }
}
