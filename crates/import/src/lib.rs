pub mod batch;
pub mod roster;

pub use batch::{verify_roster, BatchMetadata, BatchReport, CertificateResult, ReportStyle};
pub use roster::{import_roster, ImportError, RosterEntry, RosterProfile};
