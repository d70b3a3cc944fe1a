//! Project persistence.

use std::path::{Path, PathBuf};

use rusqlite::{params, Row};

use super::preferences::delete_prefix_in;
use super::{connect, OptionalExt, RepositoryError, Result};
use crate::models::{OcrLanguage, Project};
use crate::preferences::project_key_prefixes;

/// SQLite-backed project repository.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    db_path: PathBuf,
}

impl ProjectRepository {
    pub(super) fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    /// Get a project by id.
    pub fn get(&self, id: &str) -> Result<Option<Project>> {
        let conn = connect(&self.db_path)?;
        let row = conn
            .query_row(
                "SELECT id, title, ocr_lang, created_at, updated_at FROM projects WHERE id = ?",
                params![id],
                read_row,
            )
            .optional()?;
        row.map(into_project).transpose()
    }

    /// Insert or fully replace a project.
    pub fn upsert(&self, project: &Project) -> Result<()> {
        let conn = connect(&self.db_path)?;
        conn.execute(
            r#"INSERT INTO projects (id, title, ocr_lang, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5)
               ON CONFLICT(id) DO UPDATE SET
                   title = excluded.title,
                   ocr_lang = excluded.ocr_lang,
                   created_at = excluded.created_at,
                   updated_at = excluded.updated_at"#,
            params![
                project.id,
                project.title,
                project.ocr_lang.as_str(),
                project.created_at,
                project.updated_at,
            ],
        )?;
        Ok(())
    }

    /// Write back an existing project. Never creates one.
    ///
    /// Returns false when the project no longer exists.
    pub fn update(&self, project: &Project) -> Result<bool> {
        let conn = connect(&self.db_path)?;
        let updated = conn.execute(
            "UPDATE projects SET title = ?2, ocr_lang = ?3, updated_at = ?4 WHERE id = ?1",
            params![
                project.id,
                project.title,
                project.ocr_lang.as_str(),
                project.updated_at,
            ],
        )?;
        Ok(updated > 0)
    }

    /// Delete a project together with all of its pages and per-page
    /// preference entries, in a single transaction.
    ///
    /// Returns whether the project existed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut conn = connect(&self.db_path)?;
        let tx = conn.transaction()?;

        let pages = tx.execute("DELETE FROM pages WHERE project_id = ?", params![id])?;
        for prefix in project_key_prefixes(id) {
            delete_prefix_in(&tx, &prefix)?;
        }
        let removed = tx.execute("DELETE FROM projects WHERE id = ?", params![id])?;

        tx.commit()?;
        tracing::debug!("Deleted project {} ({} pages)", id, pages);
        Ok(removed > 0)
    }

    /// List all projects, most recently updated first.
    pub fn list(&self) -> Result<Vec<Project>> {
        let conn = connect(&self.db_path)?;
        let mut stmt = conn.prepare(
            "SELECT id, title, ocr_lang, created_at, updated_at FROM projects ORDER BY updated_at DESC, created_at DESC",
        )?;

        let rows = stmt
            .query_map([], read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_project).collect()
    }
}

type ProjectRow = (String, String, String, i64, i64);

fn read_row(row: &Row) -> rusqlite::Result<ProjectRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn into_project((id, title, lang, created_at, updated_at): ProjectRow) -> Result<Project> {
    let ocr_lang = lang
        .parse::<OcrLanguage>()
        .map_err(|message| RepositoryError::Corrupt {
            table: "projects",
            message,
        })?;
    Ok(Project {
        id,
        title,
        ocr_lang,
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::super::Store;
    use crate::models::{OcrLanguage, Project};
    use tempfile::tempdir;

    #[test]
    fn test_upsert_get_and_replace() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();

        let mut project = Project::new("Veyi Padagalu", OcrLanguage::Tel);
        store.projects().upsert(&project).unwrap();

        project.title = "Vol. 2".to_string();
        project.ocr_lang = OcrLanguage::Kan;
        store.projects().upsert(&project).unwrap();

        let loaded = store.projects().get(&project.id).unwrap().unwrap();
        assert_eq!(loaded, project);
        assert!(store.projects().get("missing").unwrap().is_none());
    }

    #[test]
    fn test_list_orders_by_updated_at_desc() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();

        let mut older = Project::new("older", OcrLanguage::Tel);
        older.updated_at = 1_000;
        let mut newer = Project::new("newer", OcrLanguage::Tel);
        newer.updated_at = 2_000;
        store.projects().upsert(&older).unwrap();
        store.projects().upsert(&newer).unwrap();

        let titles: Vec<_> = store
            .projects()
            .list()
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[test]
    fn test_update_never_recreates_deleted_project() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();

        let mut project = Project::new("Gone", OcrLanguage::Tel);
        store.projects().upsert(&project).unwrap();
        project.ocr_lang = OcrLanguage::Hin;
        assert!(store.projects().update(&project).unwrap());
        assert_eq!(
            store.projects().get(&project.id).unwrap().unwrap().ocr_lang,
            OcrLanguage::Hin
        );

        assert!(store.projects().delete(&project.id).unwrap());
        assert!(!store.projects().update(&project).unwrap());
        assert!(store.projects().get(&project.id).unwrap().is_none());
        assert!(store.projects().list().unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_project() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        assert!(!store.projects().delete("nope").unwrap());
    }
}
