//! Export command.

use std::path::{Path, PathBuf};

use console::style;

use crate::config::Settings;
use crate::export::{export_filename, render, ExportFormat};

use super::helpers::{open_store, resolve_project};

/// Export a project as plain text or a JSON backup.
pub async fn cmd_export(
    settings: &Settings,
    key: &str,
    format: ExportFormat,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let project = resolve_project(&store, key)?;
    let pages = store.pages().list_by_project(&project.id)?;
    let body = render(format, &project, &pages)?;

    if output == Some(Path::new("-")) {
        println!("{}", body);
        return Ok(());
    }

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(export_filename(&project.title, format)));
    tokio::fs::write(&path, body).await?;

    println!(
        "{} Exported {} page(s) to {}",
        style("✓").green(),
        pages.len(),
        path.display()
    );
    Ok(())
}
