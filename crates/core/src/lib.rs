pub mod config;
pub mod extract;
pub mod field;
pub mod hash;
pub mod record;
pub mod verdict;

pub use config::{BackendConfig, ConfigError, LogFormat, OcrEngineKind, PramaanConfig};
pub use extract::{extract_fields, ExtractionRules, Extractor, OcrLines};
pub use field::Field;
pub use hash::{canonical_hash, sha256_bytes, sha256_hex, to_hex, HashScheme, KeyStyle};
pub use record::{FieldRecord, ABSENT_MARKER};
pub use verdict::{BackendError, Comparison, ComparisonBackend, Verdict, VerificationStatus};
