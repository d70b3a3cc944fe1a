//! Page persistence, including raster images.

use std::path::{Path, PathBuf};

use rusqlite::{params, Row};

use super::{connect, OptionalExt, RepositoryError, Result};
use crate::models::{Page, PageImage, PageStatus};

const PAGE_COLUMNS: &str = "id, project_id, page_number, width, height, status, ocr_text, \
                            corrected_text, last_error, created_at, updated_at";

/// SQLite-backed page repository.
#[derive(Debug, Clone)]
pub struct PageRepository {
    db_path: PathBuf,
}

impl PageRepository {
    pub(super) fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    /// Get a page record by id.
    pub fn get(&self, id: &str) -> Result<Option<Page>> {
        let conn = connect(&self.db_path)?;
        let page = conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS),
                params![id],
                row_to_page,
            )
            .optional()?;
        page.transpose()
    }

    /// Get the raster image stored with a page.
    pub fn get_image(&self, id: &str) -> Result<Option<PageImage>> {
        let conn = connect(&self.db_path)?;
        let image = conn
            .query_row(
                "SELECT image, mime_type FROM pages WHERE id = ?",
                params![id],
                |row| Ok(PageImage::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(image)
    }

    /// Replace the stored record for `page.id`. The image is kept.
    ///
    /// Returns false when no such page exists.
    pub fn upsert(&self, page: &Page) -> Result<bool> {
        let conn = connect(&self.db_path)?;
        let updated = conn.execute(
            r#"UPDATE pages SET
                   project_id = ?2,
                   page_number = ?3,
                   width = ?4,
                   height = ?5,
                   status = ?6,
                   ocr_text = ?7,
                   corrected_text = ?8,
                   last_error = ?9,
                   created_at = ?10,
                   updated_at = ?11
               WHERE id = ?1"#,
            params![
                page.id,
                page.project_id,
                page.page_number,
                page.width,
                page.height,
                page.status.as_str(),
                page.ocr_text,
                page.corrected_text,
                page.last_error,
                page.created_at,
                page.updated_at,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Insert a whole import batch in one transaction.
    pub fn bulk_insert(&self, pages: &[(Page, PageImage)]) -> Result<usize> {
        let mut conn = connect(&self.db_path)?;
        let tx = conn.transaction()?;
        for (page, image) in pages {
            insert_page(&tx, page, image)?;
        }
        tx.commit()?;
        tracing::debug!("Inserted {} pages", pages.len());
        Ok(pages.len())
    }

    /// List a project's pages in page-number order.
    pub fn list_by_project(&self, project_id: &str) -> Result<Vec<Page>> {
        let conn = connect(&self.db_path)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages WHERE project_id = ? ORDER BY page_number",
            PAGE_COLUMNS
        ))?;

        let pages = stmt
            .query_map(params![project_id], row_to_page)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        pages.into_iter().collect()
    }

    /// Count a project's pages.
    pub fn count_by_project(&self, project_id: &str) -> Result<u64> {
        let conn = connect(&self.db_path)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE project_id = ?",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn insert_page(conn: &rusqlite::Connection, page: &Page, image: &PageImage) -> Result<()> {
    conn.execute(
        r#"INSERT INTO pages
           (id, project_id, page_number, image, mime_type, width, height, status,
            ocr_text, corrected_text, last_error, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
        params![
            page.id,
            page.project_id,
            page.page_number,
            image.bytes,
            image.mime_type,
            page.width,
            page.height,
            page.status.as_str(),
            page.ocr_text,
            page.corrected_text,
            page.last_error,
            page.created_at,
            page.updated_at,
        ],
    )?;
    Ok(())
}

/// Rows decode in two steps so an unknown status surfaces as a corrupt
/// record instead of a rusqlite conversion error.
fn row_to_page(row: &Row) -> rusqlite::Result<Result<Page>> {
    let status: String = row.get(5)?;
    let page = Page {
        id: row.get(0)?,
        project_id: row.get(1)?,
        page_number: row.get(2)?,
        width: row.get(3)?,
        height: row.get(4)?,
        status: PageStatus::New,
        ocr_text: row.get(6)?,
        corrected_text: row.get(7)?,
        last_error: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    };
    Ok(match PageStatus::from_str(&status) {
        Some(status) => Ok(Page { status, ..page }),
        None => Err(RepositoryError::Corrupt {
            table: "pages",
            message: format!("unknown status '{}' on page {}", status, page.id),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::super::Store;
    use crate::models::{OcrLanguage, Page, PageImage, PageStatus, Project};
    use tempfile::tempdir;

    fn png() -> PageImage {
        PageImage::new(vec![0x89, b'P', b'N', b'G'], "image/png")
    }

    fn setup() -> (Store, Project, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        let project = Project::new("Book", OcrLanguage::Tel);
        store.projects().upsert(&project).unwrap();
        (store, project, dir)
    }

    #[test]
    fn test_bulk_insert_and_list_in_page_order() {
        let (store, project, _dir) = setup();
        let batch: Vec<_> = [3, 1, 2]
            .into_iter()
            .map(|n| (Page::new(&project.id, n, 10, 20), png()))
            .collect();

        assert_eq!(store.pages().bulk_insert(&batch).unwrap(), 3);

        let numbers: Vec<_> = store
            .pages()
            .list_by_project(&project.id)
            .unwrap()
            .iter()
            .map(|p| p.page_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(store.pages().count_by_project(&project.id).unwrap(), 3);
    }

    #[test]
    fn test_bulk_insert_is_atomic() {
        let (store, project, _dir) = setup();
        let first = Page::new(&project.id, 1, 10, 20);
        // Same page number twice violates the per-project unique index.
        let clash = Page::new(&project.id, 1, 10, 20);

        let result = store
            .pages()
            .bulk_insert(&[(first, png()), (clash, png())]);
        assert!(result.is_err());
        assert_eq!(store.pages().count_by_project(&project.id).unwrap(), 0);
    }

    #[test]
    fn test_upsert_replaces_record_and_keeps_image() {
        let (store, project, _dir) = setup();
        let mut page = Page::new(&project.id, 1, 10, 20);
        store.pages().bulk_insert(&[(page.clone(), png())]).unwrap();

        page.complete_ocr("అ");
        assert!(store.pages().upsert(&page).unwrap());

        let loaded = store.pages().get(&page.id).unwrap().unwrap();
        assert_eq!(loaded.status, PageStatus::Done);
        assert_eq!(loaded.corrected_text, "అ");
        assert_eq!(store.pages().get_image(&page.id).unwrap().unwrap(), png());
    }

    #[test]
    fn test_upsert_missing_page_reports_false() {
        let (store, project, _dir) = setup();
        let page = Page::new(&project.id, 1, 10, 20);
        assert!(!store.pages().upsert(&page).unwrap());
    }

    #[test]
    fn test_cascade_delete_removes_pages() {
        let (store, project, _dir) = setup();
        let other = Project::new("Other", OcrLanguage::Eng);
        store.projects().upsert(&other).unwrap();

        let batch: Vec<_> = (1..=4)
            .map(|n| (Page::new(&project.id, n, 10, 20), png()))
            .collect();
        store.pages().bulk_insert(&batch).unwrap();
        store
            .pages()
            .bulk_insert(&[(Page::new(&other.id, 1, 10, 20), png())])
            .unwrap();

        assert!(store.projects().delete(&project.id).unwrap());

        assert!(store.projects().get(&project.id).unwrap().is_none());
        assert!(store.pages().list_by_project(&project.id).unwrap().is_empty());
        for (page, _) in &batch {
            assert!(store.pages().get(&page.id).unwrap().is_none());
        }
        assert_eq!(store.pages().count_by_project(&other.id).unwrap(), 1);
    }
}
