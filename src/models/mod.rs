//! Data models for bookocr.

mod page;
mod project;

pub use page::{Page, PageImage, PageStatus};
pub use project::{OcrLanguage, Project, DEFAULT_PROJECT_TITLE};
