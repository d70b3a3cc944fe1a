//! PDF rasterization via pdftoppm.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use super::dimensions::read_dimensions;
use super::ImportError;

pub const PDFTOPPM_NOT_FOUND: &str =
    "pdftoppm not found. Install poppler-utils (Debian/Ubuntu) or poppler (Homebrew).";

/// One rasterized PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterPage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Turns a PDF document into page images, in document order.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<RasterPage>, ImportError>;
}

/// Rasterizer backed by the `pdftoppm` command from poppler.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    dpi: u32,
}

impl PdftoppmRasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    /// Whether pdftoppm can be found on PATH.
    pub fn is_available() -> bool {
        which::which("pdftoppm").is_ok()
    }
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<RasterPage>, ImportError> {
        let temp = tempfile::Builder::new()
            .prefix("bookocr-raster-")
            .tempdir()?;
        let input = temp.path().join("input.pdf");
        tokio::fs::write(&input, pdf).await?;

        let dpi = self.dpi.to_string();
        let output = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi])
            .arg(&input)
            .arg(temp.path().join("page"))
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                return Err(ImportError::Rasterize(format!(
                    "pdftoppm failed: {}",
                    stderr.trim()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImportError::RasterizerUnavailable(
                    PDFTOPPM_NOT_FOUND.to_string(),
                ))
            }
            Err(e) => return Err(ImportError::Io(e)),
        }

        let images = collect_page_images(temp.path())?;
        if images.is_empty() {
            return Err(ImportError::Rasterize(
                "pdftoppm produced no pages".to_string(),
            ));
        }

        let mut pages = Vec::with_capacity(images.len());
        for path in images {
            let png = tokio::fs::read(&path).await?;
            let (width, height) = read_dimensions(&png)?;
            pages.push(RasterPage { png, width, height });
        }
        tracing::debug!("Rasterized PDF into {} pages at {} DPI", pages.len(), self.dpi);
        Ok(pages)
    }
}

/// Find pdftoppm output images in page order.
///
/// pdftoppm names files page-1.png or page-01.png etc.; the padding width
/// depends on the total page count.
pub fn collect_page_images(dir: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let mut numbered = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let number = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("page-"))
            .and_then(|n| n.strip_suffix(".png"))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            numbered.push((number, path));
        }
    }
    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_page_images_numeric_order() {
        let temp = TempDir::new().unwrap();
        for name in ["page-10.png", "page-02.png", "page-1.png", "input.pdf", "page-x.png"] {
            std::fs::write(temp.path().join(name), b"").unwrap();
        }

        let names: Vec<_> = collect_page_images(temp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["page-1.png", "page-02.png", "page-10.png"]);
    }

    #[test]
    fn test_collect_page_images_empty() {
        let temp = TempDir::new().unwrap();
        assert!(collect_page_images(temp.path()).unwrap().is_empty());
    }
}
