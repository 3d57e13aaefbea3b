use pramaan_core::OcrLines;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
}

/// Abstraction over an OCR engine.
/// Implementations accept raw PNG/JPEG image bytes and return the recognized
/// text fragments in reading order.
pub trait OcrBackend: Send + Sync {
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrLines, OcrError>;
}

impl<T: OcrBackend + ?Sized> OcrBackend for Box<T> {
    fn recognize(&self, image_bytes: &[u8]) -> Result<OcrLines, OcrError> {
        (**self).recognize(image_bytes)
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set fragments, for exercising the pipeline without an engine.
pub struct MockRecognizer {
    pub fragments: Vec<String>,
}

impl MockRecognizer {
    pub fn new<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        Self { fragments: fragments.into_iter().map(Into::into).collect() }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrLines, OcrError> {
        Ok(OcrLines::from_fragments(&self.fragments))
    }
}

// ── Unavailable backend ───────────────────────────────────────────────────────

/// Stands in for an engine that failed to initialize.
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl OcrBackend for UnavailableRecognizer {
    fn recognize(&self, _image_bytes: &[u8]) -> Result<OcrLines, OcrError> {
        Err(OcrError::NotAvailable(self.reason.clone()))
    }
}

// ── Tesseract backend (optional, gated behind `tesseract` feature) ─────────────

#[cfg(feature = "tesseract")]
pub mod tesseract_backend {
    use super::{OcrBackend, OcrError};
    use leptess::LepTess;
    use pramaan_core::OcrLines;

    pub struct TesseractRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl TesseractRecognizer {
        /// Initializes the engine once so a missing language pack shows up at startup.
        pub fn new(data_path: Option<String>, lang: &str) -> Result<Self, OcrError> {
            LepTess::new(data_path.as_deref(), lang)
                .map_err(|e| OcrError::NotAvailable(e.to_string()))?;
            Ok(Self { data_path, lang: lang.to_string() })
        }
    }

    impl OcrBackend for TesseractRecognizer {
        fn recognize(&self, image_bytes: &[u8]) -> Result<OcrLines, OcrError> {
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(e.to_string()))?;
            lt.set_image_from_mem(image_bytes)
                .map_err(|e| OcrError::ImageDecode(e.to_string()))?;
            let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
            Ok(OcrLines::from_text(&text))
        }
    }
}
