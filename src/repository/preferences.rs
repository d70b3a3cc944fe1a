//! Key/value storage for UI preference entries.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{connect, OptionalExt, Result};

/// SQLite-backed preference repository.
#[derive(Debug, Clone)]
pub struct PreferenceRepository {
    db_path: PathBuf,
}

impl PreferenceRepository {
    pub(super) fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = connect(&self.db_path)?;
        let value = conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = connect(&self.db_path)?;
        conn.execute(
            r#"INSERT INTO preferences (key, value, updated_at) VALUES (?1, ?2, ?3)
               ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
            params![key, value, crate::now_ms()],
        )?;
        Ok(())
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn delete_prefix(&self, prefix: &str) -> Result<usize> {
        let conn = connect(&self.db_path)?;
        Ok(delete_prefix_in(&conn, prefix)?)
    }

    /// List all entries, sorted by key.
    pub fn list(&self) -> Result<Vec<(String, String)>> {
        let conn = connect(&self.db_path)?;
        let mut stmt = conn.prepare("SELECT key, value FROM preferences ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Prefix delete on a caller's connection, so it can join a transaction.
pub(super) fn delete_prefix_in(conn: &Connection, prefix: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM preferences WHERE substr(key, 1, length(?1)) = ?1",
        params![prefix],
    )
}

#[cfg(test)]
mod tests {
    use super::super::Store;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_and_prefix_delete() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        let prefs = store.preferences();

        prefs.set("a:1", "x").unwrap();
        prefs.set("a:1", "y").unwrap();
        prefs.set("a:2", "z").unwrap();
        prefs.set("b:1", "w").unwrap();
        assert_eq!(prefs.get("a:1").unwrap().as_deref(), Some("y"));

        assert_eq!(prefs.delete_prefix("a:").unwrap(), 2);
        assert!(prefs.get("a:2").unwrap().is_none());
        assert_eq!(prefs.list().unwrap(), vec![("b:1".to_string(), "w".to_string())]);
    }
}
