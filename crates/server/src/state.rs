use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pramaan_core::config::OcrConfig;
use pramaan_core::{BackendConfig, ComparisonBackend, Extractor, OcrEngineKind, PramaanConfig};
use pramaan_ledger::LedgerClient;
use pramaan_ocr::{OcrBackend, UnavailableRecognizer, VerificationPipeline};
use pramaan_storage::{create_db, LocalRegistry};
use tracing::{info, warn};

pub type Pipeline = VerificationPipeline<Box<dyn OcrBackend>>;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }

    pub async fn from_config(config: &PramaanConfig) -> anyhow::Result<Self> {
        let backend = build_backend(config).await?;
        let pipeline = VerificationPipeline::new(
            build_recognizer(&config.ocr),
            Extractor::new(config.extraction.clone()),
            config.hashing.clone(),
            backend,
        );
        Ok(Self::new(pipeline))
    }
}

pub async fn build_backend(config: &PramaanConfig) -> anyhow::Result<Arc<dyn ComparisonBackend>> {
    match &config.backend {
        BackendConfig::Ledger { url, timeout_secs } => {
            info!("Comparing against ledger at {url}");
            let client = LedgerClient::new(url, Duration::from_secs(*timeout_secs))?;
            Ok(Arc::new(client))
        }
        BackendConfig::Local { .. } => {
            let path = config.database_path();
            info!("Comparing against local registry {}", path.display());
            let pool = create_db(&path)
                .await
                .with_context(|| format!("failed to open registry {}", path.display()))?;
            Ok(Arc::new(LocalRegistry::new(pool)))
        }
    }
}

/// An engine that fails to start is replaced by one that yields no text,
/// so the service still answers with an all-absent record.
pub fn build_recognizer(config: &OcrConfig) -> Box<dyn OcrBackend> {
    match config.engine {
        OcrEngineKind::None => {
            warn!("OCR engine disabled; uploads will extract no fields");
            Box::new(UnavailableRecognizer::new("OCR engine disabled in configuration"))
        }
        OcrEngineKind::Tesseract => tesseract(config),
    }
}

#[cfg(feature = "tesseract")]
fn tesseract(config: &OcrConfig) -> Box<dyn OcrBackend> {
    match pramaan_ocr::TesseractRecognizer::new(config.data_path.clone(), &config.lang) {
        Ok(engine) => {
            info!("Tesseract ready (lang {})", config.lang);
            Box::new(engine)
        }
        Err(e) => {
            warn!("Tesseract failed to initialize: {e}");
            Box::new(UnavailableRecognizer::new(e.to_string()))
        }
    }
}

#[cfg(not(feature = "tesseract"))]
fn tesseract(_config: &OcrConfig) -> Box<dyn OcrBackend> {
    warn!("Built without the `tesseract` feature; uploads will extract no fields");
    Box::new(UnavailableRecognizer::new("built without tesseract support"))
}
