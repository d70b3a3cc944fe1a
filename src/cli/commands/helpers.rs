//! Shared helper functions for CLI commands.

use anyhow::{bail, Context};
use chrono::{Local, TimeZone};

use crate::config::Settings;
use crate::models::Project;
use crate::repository::Store;
use crate::session::ProofreadingSession;

/// Open the project database, failing if `init` has not been run.
pub fn open_store(settings: &Settings) -> anyhow::Result<Store> {
    if !settings.database_exists() {
        bail!(
            "No database at {}. Run 'bookocr init' first.",
            settings.database_path().display()
        );
    }
    Store::open(&settings.database_path()).context("Failed to open project database")
}

/// Find a project by exact id, unique id prefix, or title (case-insensitive).
pub fn resolve_project(store: &Store, key: &str) -> anyhow::Result<Project> {
    if let Some(project) = store.projects().get(key)? {
        return Ok(project);
    }

    let projects = store.projects().list()?;
    let by_prefix: Vec<&Project> = projects.iter().filter(|p| p.id.starts_with(key)).collect();
    if by_prefix.len() == 1 {
        return Ok(by_prefix[0].clone());
    }

    let by_title: Vec<&Project> = projects
        .iter()
        .filter(|p| p.title.eq_ignore_ascii_case(key))
        .collect();
    match by_title.as_slice() {
        [project] => Ok((*project).clone()),
        [] if by_prefix.is_empty() => bail!("Project '{}' not found", key),
        _ => bail!("'{}' matches more than one project; use its id", key),
    }
}

/// Open a session on the project named by `key`.
pub async fn open_session(
    settings: &Settings,
    key: &str,
) -> anyhow::Result<(Store, ProofreadingSession)> {
    let store = open_store(settings)?;
    let project = resolve_project(&store, key)?;
    let session =
        ProofreadingSession::open(store.clone(), &project.id, settings.edit_debounce()).await?;
    Ok((store, session))
}

/// Truncate to `max` characters, marking the cut with "...".
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Local date and time for a millisecond timestamp.
pub fn format_ms(ms: i64) -> String {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
