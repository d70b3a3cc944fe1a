//! Import pipeline: user files to ordered page records.
//!
//! Each file is classified as a PDF, an image, or unsupported. PDFs are
//! rasterized page by page, images are used as-is with their dimensions
//! read from the header. Page numbers continue from the project's current
//! count, in file order and then PDF page order. A failing file is reported
//! and skipped; pages already produced by earlier files are kept.

mod dimensions;
mod pdf;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Page, PageImage};

pub use dimensions::read_dimensions;
pub use pdf::{collect_page_images, PdftoppmRasterizer, RasterPage, Rasterizer, PDFTOPPM_NOT_FOUND};

#[cfg(test)]
pub(crate) use dimensions::encode_png;

pub const NO_SUPPORTED_FILES_NOTICE: &str = "No supported files selected (use PDF or images).";

/// Errors from processing a single import file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Rasterizer not available: {0}")]
    RasterizerUnavailable(String),

    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    #[error("Rasterization timed out after {0}s")]
    Timeout(u64),

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file selected for import.
#[derive(Debug, Clone)]
pub struct ImportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImportFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// What an import file turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Image { mime_type: String },
    Unsupported,
}

/// Classify a file by content, falling back to its extension.
pub fn classify(file: &ImportFile) -> FileKind {
    if let Some(kind) = infer::get(&file.bytes) {
        let mime = kind.mime_type();
        if mime == "application/pdf" {
            return FileKind::Pdf;
        }
        if mime.starts_with("image/") {
            return FileKind::Image {
                mime_type: mime.to_string(),
            };
        }
    }

    match mime_guess::from_path(&file.name).first() {
        Some(mime) if mime.essence_str() == "application/pdf" => FileKind::Pdf,
        Some(mime) if mime.type_().as_str() == "image" => FileKind::Image {
            mime_type: mime.essence_str().to_string(),
        },
        _ => FileKind::Unsupported,
    }
}

/// A file that failed partway through the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    pub file: String,
    pub message: String,
}

/// Output of one import batch, before it is persisted.
#[derive(Debug, Default)]
pub struct ImportBatch {
    pub pages: Vec<(Page, PageImage)>,
    pub skipped: Vec<String>,
    pub failures: Vec<ImportFailure>,
    /// User-facing notices in the order they happened.
    pub notices: Vec<String>,
}

/// Result of an import once merged into a session.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<Page>,
    pub skipped: Vec<String>,
    pub failures: Vec<ImportFailure>,
    pub notices: Vec<String>,
}

/// Converts import files into page records.
#[derive(Clone)]
pub struct ImportPipeline {
    rasterizer: Arc<dyn Rasterizer>,
    rasterize_timeout: Duration,
}

impl ImportPipeline {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, rasterize_timeout: Duration) -> Self {
        Self {
            rasterizer,
            rasterize_timeout,
        }
    }

    /// Pipeline using pdftoppm at the configured resolution.
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        Self::new(
            Arc::new(PdftoppmRasterizer::new(settings.raster_dpi)),
            settings.rasterize_timeout(),
        )
    }

    /// Build page records for `files`, numbering from `first_page_number`.
    pub async fn run(
        &self,
        project_id: &str,
        first_page_number: u32,
        files: &[ImportFile],
    ) -> ImportBatch {
        let mut batch = ImportBatch::default();
        let mut next_page_number = first_page_number;

        for file in files {
            let produced = match classify(file) {
                FileKind::Pdf => {
                    info!("Importing PDF: {}", file.name);
                    self.rasterize(file).await.map(|rasters| {
                        rasters
                            .into_iter()
                            .map(|r| (r.width, r.height, PageImage::new(r.png, "image/png")))
                            .collect::<Vec<_>>()
                    })
                }
                FileKind::Image { mime_type } => {
                    info!("Importing image: {}", file.name);
                    read_dimensions(&file.bytes).map(|(width, height)| {
                        vec![(width, height, PageImage::new(file.bytes.clone(), mime_type))]
                    })
                }
                FileKind::Unsupported => {
                    batch
                        .notices
                        .push(format!("Skipping unsupported file: {}", file.name));
                    batch.skipped.push(file.name.clone());
                    continue;
                }
            };

            match produced {
                Ok(images) => {
                    for (width, height, image) in images {
                        let page = Page::new(project_id, next_page_number, width, height);
                        next_page_number += 1;
                        batch.pages.push((page, image));
                    }
                }
                Err(e) => {
                    warn!("Failed to import {}: {}", file.name, e);
                    batch
                        .notices
                        .push(format!("Failed to import {}: {}", file.name, e));
                    batch.failures.push(ImportFailure {
                        file: file.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if batch.pages.is_empty() && batch.failures.is_empty() {
            batch.notices.push(NO_SUPPORTED_FILES_NOTICE.to_string());
        }
        batch
    }

    async fn rasterize(&self, file: &ImportFile) -> Result<Vec<RasterPage>, ImportError> {
        tokio::time::timeout(self.rasterize_timeout, self.rasterizer.rasterize(&file.bytes))
            .await
            .map_err(|_| ImportError::Timeout(self.rasterize_timeout.as_secs()))?
    }
}
