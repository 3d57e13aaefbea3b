use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::record::FieldRecord;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Comparison backend unreachable: {0}")]
    Unreachable(String),
    #[error("Comparison backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed backend response: {0}")]
    Malformed(String),
    #[error("Registry error: {0}")]
    Registry(String),
}

/// What a comparison backend knows about a digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub is_valid: bool,
    pub issuer: Option<String>,
    pub timestamp: Option<String>,
}

impl Comparison {
    pub fn not_found() -> Self {
        Self::default()
    }

    pub fn found(issuer: Option<String>, timestamp: Option<String>) -> Self {
        Self { is_valid: true, issuer, timestamp }
    }
}

/// Anything that can say whether a digest belongs to an issued certificate:
/// the local registry table or the remote ledger service.
#[async_trait]
pub trait ComparisonBackend: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    async fn compare(&self, digest: &str, record: &FieldRecord) -> Result<Comparison, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Valid,
    Invalid,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationStatus::Valid => write!(f, "VALID"),
            VerificationStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

const REASON_VALID: &str = "Certificate hash matches the issuer record. \
This certificate is authentic and has been verified against the issuer's ledger.";
const REASON_NOT_FOUND: &str = "Certificate hash does NOT match any issuer record. \
This certificate may be forged, altered, or not issued by the claimed institution.";

/// Outcome of one comparison, formatted for API consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub is_valid: bool,
    pub verification_status: VerificationStatus,
    pub validation_reason: String,
    pub issuer: String,
    pub timestamp: String,
}

impl Verdict {
    /// Backend failures yield an invalid verdict that names the failure
    /// instead of failing the request.
    pub fn from_result(result: &Result<Comparison, BackendError>) -> Self {
        match result {
            Ok(c) => {
                let (status, reason) = if c.is_valid {
                    (VerificationStatus::Valid, REASON_VALID.to_string())
                } else {
                    (VerificationStatus::Invalid, REASON_NOT_FOUND.to_string())
                };
                Self {
                    is_valid: c.is_valid,
                    verification_status: status,
                    validation_reason: reason,
                    issuer: c.issuer.clone().unwrap_or_else(|| "N/A".to_string()),
                    timestamp: c.timestamp.clone().unwrap_or_else(|| "0".to_string()),
                }
            }
            Err(e) => Self {
                is_valid: false,
                verification_status: VerificationStatus::Invalid,
                validation_reason: format!("Verification service failed: {e}"),
                issuer: "N/A".to_string(),
                timestamp: "0".to_string(),
            },
        }
    }
}
