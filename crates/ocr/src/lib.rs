pub mod pipeline;
pub mod preprocess;
pub mod recognizer;

pub use pipeline::{PipelineError, VerificationPipeline, VerificationReport};
pub use preprocess::{prepare_for_ocr, PreparedImage, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, UnavailableRecognizer};

#[cfg(feature = "tesseract")]
pub use recognizer::tesseract_backend::TesseractRecognizer;
