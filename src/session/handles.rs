//! Display handles: session-scoped leases on page images.
//!
//! A handle materializes a page image as a file in the session's scratch
//! directory so a viewer can load it by path or URL. A page holds at most one
//! live handle. Acquiring a new one releases the old, and `release_all`
//! clears everything when the session closes.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;
use tempfile::TempDir;

use crate::models::PageImage;

/// A live lease on one page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayHandle {
    pub id: String,
    pub page_id: String,
    pub mime_type: String,
    #[serde(skip)]
    pub path: PathBuf,
}

pub struct HandleRegistry {
    dir: TempDir,
    leases: HashMap<String, DisplayHandle>,
}

impl HandleRegistry {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("bookocr-handles-")
            .tempdir()?;
        Ok(Self {
            dir,
            leases: HashMap::new(),
        })
    }

    /// Create a handle for `page_id`, releasing any handle it already had.
    pub fn acquire(&mut self, page_id: &str, image: &PageImage) -> std::io::Result<DisplayHandle> {
        let id = crate::new_id();
        let path = self
            .dir
            .path()
            .join(format!("{}.{}", id, image.extension()));
        std::fs::write(&path, &image.bytes)?;

        let handle = DisplayHandle {
            id,
            page_id: page_id.to_string(),
            mime_type: image.mime_type.clone(),
            path,
        };
        if let Some(previous) = self.leases.insert(page_id.to_string(), handle.clone()) {
            remove_file(&previous);
        }
        Ok(handle)
    }

    pub fn get(&self, page_id: &str) -> Option<&DisplayHandle> {
        self.leases.get(page_id)
    }

    /// Look a handle up by its own id.
    pub fn find(&self, handle_id: &str) -> Option<&DisplayHandle> {
        self.leases.values().find(|h| h.id == handle_id)
    }

    /// Release every handle. Returns how many were live.
    pub fn release_all(&mut self) -> usize {
        let count = self.leases.len();
        for (_, handle) in self.leases.drain() {
            remove_file(&handle);
        }
        count
    }

    pub fn live_count(&self) -> usize {
        self.leases.len()
    }
}

fn remove_file(handle: &DisplayHandle) {
    if let Err(e) = std::fs::remove_file(&handle.path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to release handle {}: {}", handle.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> PageImage {
        PageImage::new(vec![1, 2, 3], "image/png")
    }

    #[test]
    fn test_acquire_supersedes_previous() {
        let mut registry = HandleRegistry::new().unwrap();
        let first = registry.acquire("p1", &image()).unwrap();
        assert!(first.path.exists());
        assert_eq!(first.path.extension().unwrap(), "png");

        let second = registry.acquire("p1", &image()).unwrap();
        assert_ne!(first.id, second.id);
        assert!(!first.path.exists());
        assert!(second.path.exists());
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.find(&second.id), Some(&second));
        assert!(registry.find(&first.id).is_none());
    }

    #[test]
    fn test_release_all_leaves_nothing() {
        let mut registry = HandleRegistry::new().unwrap();
        let a = registry.acquire("a", &image()).unwrap();
        let b = registry.acquire("b", &image()).unwrap();

        assert_eq!(registry.release_all(), 2);
        assert_eq!(registry.live_count(), 0);
        assert!(!a.path.exists());
        assert!(!b.path.exists());
        assert!(registry.get("a").is_none());
    }
}
