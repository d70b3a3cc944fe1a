//! Repository layer for local persistence.
//!
//! Projects, pages (with their raster images) and preference entries live in
//! one SQLite file. Each repository opens a short-lived connection per call.

mod pages;
mod preferences;
mod projects;
mod schema;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

pub use pages::PageRepository;
pub use preferences::PreferenceRepository;
pub use projects::ProjectRepository;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("corrupt record in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Open a database connection with proper concurrency settings.
pub(crate) fn connect(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path).map_err(|source| RepositoryError::Open {
        path: db_path.to_path_buf(),
        source,
    })?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 30000;
    "#,
    )?;
    Ok(conn)
}

pub(crate) trait OptionalExt<T> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Handle to the local store, bundling the per-kind repositories.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
    projects: ProjectRepository,
    pages: PageRepository,
    preferences: PreferenceRepository,
}

impl Store {
    /// Open (and if needed initialize) the store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = connect(db_path)?;
        schema::init_schema(&conn)?;
        tracing::debug!("Opened store at {}", db_path.display());

        Ok(Self {
            db_path: db_path.to_path_buf(),
            projects: ProjectRepository::new(db_path),
            pages: PageRepository::new(db_path),
            preferences: PreferenceRepository::new(db_path),
        })
    }

    pub fn projects(&self) -> &ProjectRepository {
        &self.projects
    }

    pub fn pages(&self) -> &PageRepository {
        &self.pages
    }

    pub fn preferences(&self) -> &PreferenceRepository {
        &self.preferences
    }

    /// Get the database path.
    pub fn database_path(&self) -> &Path {
        &self.db_path
    }
}
