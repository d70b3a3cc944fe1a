//! Edit command.

use std::path::Path;

use anyhow::{bail, Context};
use console::style;
use tokio::io::AsyncReadExt;

use crate::config::Settings;

use super::helpers::open_session;

/// Replace a page's corrected text from an argument, a file, or stdin.
pub async fn cmd_edit(
    settings: &Settings,
    key: &str,
    page_number: u32,
    text: Option<String>,
    file: Option<&Path>,
) -> anyhow::Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) if path == Path::new("-") => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => bail!("Pass --text or --file"),
    };

    let (_store, session) = open_session(settings, key).await?;
    let page = match session.page_by_number(page_number).await {
        Some(page) => page,
        None => bail!("Page {} not found", page_number),
    };

    let page = session.edit_text(&page.id, &text).await?;
    session.close().await;
    if let Some(e) = session.take_write_error() {
        bail!("Failed to save page {}: {}", page_number, e);
    }

    println!(
        "{} Saved page {} ({} characters)",
        style("✓").green(),
        page.page_number,
        page.corrected_text.chars().count()
    );
    Ok(())
}
