use pramaan_core::{Field, FieldRecord, HashScheme};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("No data rows")]
    NoDataRows,
    #[error("Failed to write report: {0}")]
    Report(String),
}

/// Which CSV header carries each field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterProfile {
    pub name: String,
    pub columns: Vec<(Field, String)>,
    pub delimiter: u8,
}

impl RosterProfile {
    /// Headers identical to the ledger labels, as the upload portal exports them.
    pub fn ledger() -> Self {
        Self {
            name: "ledger".to_string(),
            columns: Field::ALL.into_iter().map(|f| (f, f.ledger_label().to_string())).collect(),
            delimiter: b',',
        }
    }

    /// Registrar export layout. Pair with `KeyStyle::Registrar` to reproduce
    /// the digests uploaded from these files.
    pub fn registrar() -> Self {
        Self {
            name: "registrar".to_string(),
            columns: Field::ALL
                .into_iter()
                .map(|f| (f, f.registrar_label().to_string()))
                .collect(),
            delimiter: b',',
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "ledger" => Some(Self::ledger()),
            "registrar" => Some(Self::registrar()),
            _ => None,
        }
    }
}

impl Default for RosterProfile {
    fn default() -> Self {
        Self::ledger()
    }
}

/// One roster row, parsed and hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// 1-based data row number (header excluded).
    pub line: usize,
    pub record: FieldRecord,
    pub digest: String,
}

/// Parse a roster and digest each row under `scheme`.
pub fn import_roster<R: Read>(
    data: R,
    profile: &RosterProfile,
    scheme: &HashScheme,
) -> Result<Vec<RosterEntry>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(profile.delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = profile
        .columns
        .iter()
        .filter(|(_, h)| !headers.iter().any(|x| x == h))
        .map(|(_, h)| h.clone())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let positions: Vec<(Field, usize)> = profile
        .columns
        .iter()
        .filter_map(|(f, h)| headers.iter().position(|x| x == h).map(|i| (*f, i)))
        .collect();

    let mut entries = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result?;
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let mut record = FieldRecord::default();
        for (field, col) in &positions {
            if let Some(value) = row.get(*col) {
                record.set(*field, value);
            }
        }
        let digest = scheme.digest(&record);
        entries.push(RosterEntry { line: idx + 1, record, digest });
    }

    if entries.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    tracing::debug!("Parsed {} roster rows with profile {}", entries.len(), profile.name);
    Ok(entries)
}
