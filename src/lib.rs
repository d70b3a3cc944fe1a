//! bookocr - OCR proofreading workbench for scanned book pages.
//!
//! Pages are imported from PDFs and images into locally stored projects,
//! sent one at a time to a remote OCR service, and proofread against the
//! extracted text. Everything except OCR inference stays on this machine.

pub mod cli;
pub mod config;
pub mod export;
pub mod import;
pub mod models;
pub mod ocr;
pub mod preferences;
pub mod repository;
pub mod script;
pub mod server;
pub mod session;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a new opaque record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
