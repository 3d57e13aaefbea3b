use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/ocr/verify", post(handlers::verify_upload))
        .route("/api/extract", post(handlers::extract))
        .route("/api/hash", post(handlers::hash_record))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use pramaan_core::{
        BackendError, Comparison, ComparisonBackend, Extractor, FieldRecord, HashScheme,
    };
    use pramaan_ocr::{MockRecognizer, OcrBackend, VerificationPipeline};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pramaan-test-boundary";
    const JANE_DIGEST: &str = "405f18f59a58046a8d59475564e6f059ea61fefba831648a12492cd1b25f6965";

    fn certificate_lines() -> Vec<&'static str> {
        vec![
            "ABC Institute of Technology",
            "Department of Science",
            "Jane Doe",
            "completed the course of Data Science authorized by ABC",
            "Grade: A",
            "Roll No: 42",
            "Certificate ID: CERT-001",
        ]
    }

    struct Issued(&'static str);

    #[async_trait]
    impl ComparisonBackend for Issued {
        fn name(&self) -> &'static str {
            "issued"
        }

        async fn compare(&self, digest: &str, _: &FieldRecord) -> Result<Comparison, BackendError> {
            if digest == self.0 {
                Ok(Comparison::found(Some("0xregistrar".into()), Some("1700000000".into())))
            } else {
                Ok(Comparison::not_found())
            }
        }
    }

    fn app_with(limit: usize) -> Router {
        let recognizer: Box<dyn OcrBackend> = Box::new(MockRecognizer::new(certificate_lines()));
        let pipeline = VerificationPipeline::new(
            recognizer,
            Extractor::default(),
            HashScheme::default(),
            Arc::new(Issued(JANE_DIGEST)),
        );
        router(AppState::new(pipeline), limit)
    }

    fn app() -> Router {
        app_with(10 * 1024 * 1024)
    }

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(8, 8, |_, _| Luma([220u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn multipart(field: &str, data: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"cert.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/ocr/verify")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn verify_upload_returns_valid_report() {
        let response = app().oneshot(multipart("file", &tiny_png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["blockchain_hash"], JANE_DIGEST);
        assert_eq!(body["is_valid"], true);
        assert_eq!(body["verification_status"], "VALID");
        assert_eq!(body["issuer"], "0xregistrar");
        assert_eq!(body["extracted_data"]["holder_name"], "Jane Doe");
        assert_eq!(body["extracted_data"]["course"], "Data Science");
    }

    #[tokio::test]
    async fn missing_file_part_is_bad_request() {
        let response = app().oneshot(multipart("document", &tiny_png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().contains("No file part"));
    }

    #[tokio::test]
    async fn undecodable_upload_is_unprocessable() {
        let response = app().oneshot(multipart("file", b"%PDF-1.4 not an image")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["status"], 422);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let response = app_with(64).oneshot(multipart("file", &tiny_png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn extract_endpoint_hashes_lines() {
        let response = app()
            .oneshot(post_json("/api/extract", json!({ "lines": certificate_lines() })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["hash"], JANE_DIGEST);
        assert_eq!(
            body["extracted_data"]["university_name"],
            "ABC Institute of Technology Department of Science"
        );
    }

    #[tokio::test]
    async fn extract_endpoint_with_no_lines_is_all_absent() {
        let response = app()
            .oneshot(post_json("/api/extract", json!({ "lines": [] })))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["extracted_data"]["grade"], "N/A");
        assert_eq!(
            body["hash"],
            "2252290f078dcff85a6183ac2f15916ccf859c232269edba2d8b42784230a0f3"
        );
    }

    #[tokio::test]
    async fn extract_rejects_malformed_json_with_json_error() {
        let response = app()
            .oneshot(post_json("/api/extract", json!({ "text": "no lines key" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
        let body = json_body(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn hash_endpoint_accepts_ledger_labels() {
        let record = json!({
            "University Name": "ABC Institute of Technology Department of Science",
            "Certificate Holder Name": "Jane Doe",
            "Course": "Data Science",
            "Grade": "A",
            "Roll No": "42",
            "Certificate ID": "CERT-001",
        });
        let response = app().oneshot(post_json("/api/hash", record)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["hash"], JANE_DIGEST);
        assert_eq!(body["scheme"], "stable_json");
    }
}
