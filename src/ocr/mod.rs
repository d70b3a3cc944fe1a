//! OCR service integration.
//!
//! - `client`: the HTTP contract of the remote extraction endpoint
//! - `orchestrator`: sequential OCR runs over a session's pages

mod client;
mod orchestrator;

pub use client::{ExtractError, HttpOcrClient, TextExtractor};
pub use orchestrator::{
    OcrOrchestrator, RunEvent, RunOutcome, RunSummary, RunTarget, FINISHED_NOTICE,
    MISSING_IMAGE_MESSAGE, NO_PAGES_NOTICE, QUOTA_PAUSED_NOTICE,
};
