use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use pramaan_core::{FieldRecord, OcrLines};
use pramaan_ocr::VerificationReport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the certificate scan.
pub const UPLOAD_FIELD: &str = "file";

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn verify_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VerificationReport>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            upload = Some(field.bytes().await?);
            break;
        }
    }
    let data = upload.ok_or_else(|| ApiError::BadRequest("No file part in the request".into()))?;

    let report = state.pipeline.process_bytes(&data).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub lines: Vec<String>,
    /// Defaults to the lines joined by single spaces.
    #[serde(default)]
    pub full_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub extracted_data: FieldRecord,
    pub hash: String,
}

/// Run extraction and hashing on text that was recognized elsewhere.
pub async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(req) = payload?;
    let lines = OcrLines::from_fragments(&req.lines);
    let full_text = req.full_text.unwrap_or_else(|| lines.full_text());

    let record = state.pipeline.extractor().extract(lines.lines(), &full_text);
    let hash = state.pipeline.scheme().digest(&record);
    Ok(Json(ExtractResponse { extracted_data: record, hash }))
}

#[derive(Debug, Serialize)]
pub struct HashResponse {
    pub hash: String,
    pub scheme: String,
}

pub async fn hash_record(
    State(state): State<AppState>,
    payload: Result<Json<FieldRecord>, JsonRejection>,
) -> Result<Json<HashResponse>, ApiError> {
    let Json(record) = payload?;
    let scheme = state.pipeline.scheme();
    Ok(Json(HashResponse { hash: scheme.digest(&record), scheme: scheme.to_string() }))
}
