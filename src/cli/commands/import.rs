//! Import command.

use std::path::PathBuf;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::import::{ImportFile, ImportPipeline, PdftoppmRasterizer, PDFTOPPM_NOT_FOUND};

use super::helpers::open_session;

/// Import PDFs and images into a project, appending pages in file order.
pub async fn cmd_import(settings: &Settings, key: &str, paths: &[PathBuf]) -> anyhow::Result<()> {
    let (_store, session) = open_session(settings, key).await?;

    let has_pdf = paths.iter().any(|p| {
        p.extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    });
    if has_pdf && !PdftoppmRasterizer::is_available() {
        println!("{} {}", style("!").yellow(), PDFTOPPM_NOT_FOUND);
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match ImportFile::read(path).await {
            Ok(file) => files.push(file),
            Err(e) => println!(
                "{} Could not read {}: {}",
                style("✗").red(),
                path.display(),
                e
            ),
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Importing {} file(s)...", files.len()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let pipeline = ImportPipeline::from_settings(settings);
    let report = session.import(&pipeline, &files).await;
    spinner.finish_and_clear();
    let report = report?;

    for notice in &report.notices {
        let marker = if notice.starts_with("Imported") {
            style("✓").green()
        } else {
            style("!").yellow()
        };
        println!("{} {}", marker, notice);
    }
    if let (Some(first), Some(last)) = (report.imported.first(), report.imported.last()) {
        println!(
            "  Pages {}-{} added to '{}'",
            first.page_number,
            last.page_number,
            session.project().await.title
        );
    }

    session.close().await;
    Ok(())
}
