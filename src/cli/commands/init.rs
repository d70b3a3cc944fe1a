//! Initialize and check commands.

use console::style;

use crate::config::Settings;
use crate::import::{PdftoppmRasterizer, PDFTOPPM_NOT_FOUND};
use crate::ocr::HttpOcrClient;
use crate::repository::Store;

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let store = Store::open(&settings.database_path())?;
    let projects = store.projects().list()?;

    println!(
        "{} Initialized bookocr in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    if projects.is_empty() {
        println!("  Create a project with 'bookocr project new <title>'");
    } else {
        println!("  {} existing project(s)", projects.len());
    }

    Ok(())
}

/// Check external dependencies: pdftoppm and the OCR service.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let mut ok = true;

    if PdftoppmRasterizer::is_available() {
        println!("{} pdftoppm found", style("✓").green());
    } else {
        ok = false;
        println!("{} {}", style("✗").red(), PDFTOPPM_NOT_FOUND);
    }

    let client = HttpOcrClient::from_settings(settings)?;
    match client.health().await {
        Ok(()) => println!(
            "{} OCR service reachable at {}",
            style("✓").green(),
            client.base_url()
        ),
        Err(e) => {
            ok = false;
            println!(
                "{} OCR service at {} not reachable: {}",
                style("✗").red(),
                client.base_url(),
                e
            );
        }
    }

    if settings.database_exists() {
        println!(
            "{} Database at {}",
            style("✓").green(),
            settings.database_path().display()
        );
    } else {
        println!(
            "{} No database yet; run 'bookocr init'",
            style("!").yellow()
        );
    }

    if !ok {
        anyhow::bail!("Some checks failed");
    }
    Ok(())
}
