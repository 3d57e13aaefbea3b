pub mod client;

pub use client::{LedgerClient, VerifyRequest, VerifyResponse, VERIFY_PATH};
