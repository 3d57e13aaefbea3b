use std::sync::Arc;

use pramaan_core::{
    sha256_hex, ComparisonBackend, Extractor, FieldRecord, HashScheme, OcrLines, Verdict,
    VerificationStatus,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::preprocess::{self, PreprocessError};
use crate::recognizer::OcrBackend;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Empty upload")]
    EmptyUpload,
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Recognition task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Response body for one verified upload.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub request_id: Uuid,
    /// SHA-256 of the uploaded bytes, for correlating logs with files.
    pub upload_sha256: String,
    pub extracted_data: FieldRecord,
    pub hash_scheme: String,
    /// Canonical digest of `extracted_data`.
    pub blockchain_hash: String,
    pub is_valid: bool,
    pub verification_status: VerificationStatus,
    pub validation_reason: String,
    pub issuer: String,
    pub timestamp: String,
}

/// Orchestrates: preprocess → OCR → extract → hash → compare.
pub struct VerificationPipeline<R: OcrBackend> {
    recognizer: Arc<R>,
    extractor: Extractor,
    scheme: HashScheme,
    backend: Arc<dyn ComparisonBackend>,
}

impl<R: OcrBackend + 'static> VerificationPipeline<R> {
    pub fn new(
        recognizer: R,
        extractor: Extractor,
        scheme: HashScheme,
        backend: Arc<dyn ComparisonBackend>,
    ) -> Self {
        Self { recognizer: Arc::new(recognizer), extractor, scheme, backend }
    }

    pub fn scheme(&self) -> &HashScheme {
        &self.scheme
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Recognize lines from an upload. Engine failures degrade to an empty
    /// line sequence; only undecodable uploads are errors.
    pub fn recognize(&self, data: &[u8]) -> Result<OcrLines, PipelineError> {
        recognize_upload(self.recognizer.as_ref(), data)
    }

    /// Same as [`recognize`](Self::recognize), run on the blocking pool so
    /// image decoding and the engine stay off the async workers.
    pub async fn recognize_blocking(&self, data: &[u8]) -> Result<OcrLines, PipelineError> {
        if data.is_empty() {
            return Err(PipelineError::EmptyUpload);
        }
        let recognizer = Arc::clone(&self.recognizer);
        let data = data.to_vec();
        tokio::task::spawn_blocking(move || recognize_upload(recognizer.as_ref(), &data)).await?
    }

    /// Process raw upload bytes end to end.
    pub async fn process_bytes(&self, data: &[u8]) -> Result<VerificationReport, PipelineError> {
        let request_id = Uuid::new_v4();
        let upload_sha256 = sha256_hex(data);
        info!(%request_id, "Verifying upload {}", &upload_sha256[..12]);

        let lines = self.recognize_blocking(data).await?;
        debug!(%request_id, "OCR produced {} lines", lines.len());

        let record = self.extractor.extract_lines(&lines);
        Ok(self.verify_record(request_id, upload_sha256, record).await)
    }

    /// Hash an already-extracted record and ask the backend about it.
    pub async fn verify_record(
        &self,
        request_id: Uuid,
        upload_sha256: String,
        record: FieldRecord,
    ) -> VerificationReport {
        let digest = self.scheme.digest(&record);
        info!(
            %request_id,
            fields = record.present_count(),
            "Digest {} under {}",
            digest,
            self.scheme
        );

        let result = self.backend.compare(&digest, &record).await;
        if let Err(e) = &result {
            warn!(%request_id, backend = self.backend.name(), "Comparison failed: {e}");
        }
        let verdict = Verdict::from_result(&result);
        info!(%request_id, status = %verdict.verification_status, "Verification finished");

        VerificationReport {
            request_id,
            upload_sha256,
            extracted_data: record,
            hash_scheme: self.scheme.to_string(),
            blockchain_hash: digest,
            is_valid: verdict.is_valid,
            verification_status: verdict.verification_status,
            validation_reason: verdict.validation_reason,
            issuer: verdict.issuer,
            timestamp: verdict.timestamp,
        }
    }
}

fn recognize_upload<R: OcrBackend + ?Sized>(
    recognizer: &R,
    data: &[u8],
) -> Result<OcrLines, PipelineError> {
    if data.is_empty() {
        return Err(PipelineError::EmptyUpload);
    }
    let prepared = preprocess::prepare_for_ocr(data)?;
    debug!(
        "Prepared {}x{} image (source format {:?})",
        prepared.width, prepared.height, prepared.source_format
    );

    match recognizer.recognize(&prepared.png) {
        Ok(lines) => Ok(lines),
        Err(e) => {
            warn!("OCR failed, continuing with no text: {e}");
            Ok(OcrLines::default())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
