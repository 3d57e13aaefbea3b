//! Client for the ledger service's certificate verification endpoint.

use async_trait::async_trait;
use pramaan_core::{BackendError, Comparison, ComparisonBackend, Field, FieldRecord};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const VERIFY_PATH: &str = "/api/verify-certificate";

const DEFAULT_MAX_RETRIES: u32 = 2;

/// Request body: the record under the ledger's own key names, absent as "N/A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest<'a> {
    pub university: &'a str,
    pub holder_name: &'a str,
    pub course: &'a str,
    pub grade: &'a str,
    pub roll_no: &'a str,
    pub certificate_id: &'a str,
}

impl<'a> VerifyRequest<'a> {
    pub fn from_record(record: &'a FieldRecord) -> Self {
        Self {
            university: record.display_value(Field::UniversityName),
            holder_name: record.display_value(Field::HolderName),
            course: record.display_value(Field::Course),
            grade: record.display_value(Field::Grade),
            roll_no: record.display_value(Field::RollNo),
            certificate_id: record.display_value(Field::CertificateId),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    /// Seconds since epoch; the service sends it as a string, older builds as a number.
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub candidate_hash: Option<String>,
}

impl VerifyResponse {
    fn into_comparison(self) -> Comparison {
        let timestamp = self.timestamp.and_then(|t| match t {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
        let issuer = self.issuer.filter(|i| !i.is_empty() && !is_zero_address(i));
        Comparison { is_valid: self.is_valid, issuer, timestamp }
    }
}

// The contract returns the zero address as issuer for unknown hashes.
fn is_zero_address(s: &str) -> bool {
    s.strip_prefix("0x").is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c == '0'))
}

fn is_retryable(error: &BackendError) -> bool {
    matches!(error, BackendError::Unreachable(_))
        || matches!(error, BackendError::Status { status, .. } if *status >= 500)
}

pub struct LedgerClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl LedgerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Unreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One round trip to the verification endpoint.
    pub async fn verify(&self, record: &FieldRecord) -> Result<VerifyResponse, BackendError> {
        let url = format!("{}{}", self.base_url, VERIFY_PATH);
        let resp = self
            .client
            .post(&url)
            .json(&VerifyRequest::from_record(record))
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|e| {
                warn!("Failed to read ledger error body: {e}");
                String::new()
            });
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        resp.json::<VerifyResponse>()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn verify_with_retry(&self, record: &FieldRecord) -> Result<VerifyResponse, BackendError> {
        let mut delay = Duration::from_millis(250);
        let mut attempt = 0;
        loop {
            match self.verify(record).await {
                Ok(resp) => return Ok(resp),
                Err(e) if is_retryable(&e) && attempt < self.max_retries => {
                    attempt += 1;
                    warn!("Ledger request failed (attempt {attempt}): {e}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(4));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl ComparisonBackend for LedgerClient {
    fn name(&self) -> &'static str {
        "ledger"
    }

    async fn compare(&self, digest: &str, record: &FieldRecord) -> Result<Comparison, BackendError> {
        debug!("Asking ledger about {digest}");
        let resp = self.verify_with_retry(record).await?;

        if let Some(candidate) = resp.candidate_hash.as_deref() {
            if !candidate.eq_ignore_ascii_case(digest) {
                warn!(
                    local = digest,
                    ledger = candidate,
                    "Ledger computed a different digest; hash schemes are out of step"
                );
            }
        }

        Ok(resp.into_comparison())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn jane() -> FieldRecord {
        FieldRecord::default()
            .with(Field::HolderName, "Jane Doe")
            .with(Field::Grade, "A")
            .with(Field::CertificateId, "CERT-001")
    }

    fn client(url: &str) -> LedgerClient {
        LedgerClient::new(url, Duration::from_secs(5)).unwrap().with_max_retries(0)
    }

    #[test]
    fn request_uses_ledger_keys_and_marker() {
        let record = jane();
        let v = serde_json::to_value(VerifyRequest::from_record(&record)).unwrap();
        assert_eq!(
            v,
            json!({
                "university": "N/A",
                "holderName": "Jane Doe",
                "course": "N/A",
                "grade": "A",
                "rollNo": "N/A",
                "certificateId": "CERT-001",
            })
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert_eq!(client("http://ledger:3000/").base_url(), "http://ledger:3000");
    }

    #[test]
    fn zero_address_is_not_an_issuer() {
        assert!(is_zero_address("0x0000000000000000000000000000000000000000"));
        assert!(!is_zero_address("0x00a0"));
        assert!(!is_zero_address("0x"));
    }

    #[tokio::test]
    async fn valid_response_maps_to_comparison() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", VERIFY_PATH)
            .match_body(Matcher::PartialJson(json!({"holderName": "Jane Doe", "rollNo": "N/A"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"isValid":true,"timestamp":"1700000000","issuer":"0xabc","candidateHash":"ff"}"#)
            .create_async()
            .await;

        let c = client(&server.url()).compare("ff", &jane()).await.unwrap();
        assert_eq!(c, Comparison::found(Some("0xabc".into()), Some("1700000000".into())));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_hash_drops_zero_issuer() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", VERIFY_PATH)
            .with_status(200)
            .with_body(r#"{"isValid":false,"timestamp":0,"issuer":"0x0000000000000000000000000000000000000000"}"#)
            .create_async()
            .await;

        let c = client(&server.url()).compare("ff", &jane()).await.unwrap();
        assert!(!c.is_valid);
        assert_eq!(c.issuer, None);
        assert_eq!(c.timestamp.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn server_error_is_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", VERIFY_PATH)
            .with_status(500)
            .with_body(r#"{"error":"contract not deployed"}"#)
            .create_async()
            .await;

        let err = client(&server.url()).compare("ff", &jane()).await.unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("contract not deployed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", VERIFY_PATH)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let c = client(&server.url()).with_max_retries(2);
        assert!(c.compare("ff", &jane()).await.is_err());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", VERIFY_PATH)
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client(&server.url()).compare("ff", &jane()).await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_ledger() {
        // Port 9 (discard) is not listening in test environments.
        let err = client("http://127.0.0.1:9").compare("ff", &jane()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unreachable(_)));
    }
}
