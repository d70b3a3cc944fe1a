//! OCR command.

use std::sync::Arc;

use anyhow::bail;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::models::OcrLanguage;
use crate::ocr::{HttpOcrClient, OcrOrchestrator, RunEvent, RunOutcome, RunTarget};

use super::helpers::open_session;

/// Run OCR over a project, or one page of it, showing progress per page.
pub async fn cmd_ocr(
    settings: &Settings,
    key: &str,
    page_number: Option<u32>,
    lang: Option<OcrLanguage>,
) -> anyhow::Result<()> {
    let (_store, session) = open_session(settings, key).await?;
    let project = session.project().await;
    let lang = lang.unwrap_or(project.ocr_lang);

    let target = match page_number {
        Some(n) => match session.page_by_number(n).await {
            Some(page) => RunTarget::Page(page.id),
            None => bail!("Page {} not found in '{}'", n, project.title),
        },
        None => RunTarget::All,
    };

    let client = HttpOcrClient::from_settings(settings)?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let orchestrator = OcrOrchestrator::new(Arc::new(client), settings.request_timeout())
        .with_events(tx);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")?
            .progress_chars("█▓░"),
    );

    let progress = {
        let pb = pb.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    RunEvent::Started { total } => pb.set_length(total as u64),
                    RunEvent::PageStarted { page_number, .. } => {
                        pb.set_message(format!("page {}", page_number));
                    }
                    RunEvent::PageDone { .. } => pb.inc(1),
                    RunEvent::PageFailed {
                        page_number,
                        message,
                        ..
                    } => {
                        pb.println(format!(
                            "{} Page {}: {}",
                            style("✗").red(),
                            page_number,
                            message
                        ));
                        pb.inc(1);
                    }
                    RunEvent::QuotaHalted { message, .. } => {
                        pb.println(format!("{} {}", style("!").yellow(), message));
                        pb.inc(1);
                    }
                    RunEvent::Finished { .. } => break,
                }
            }
        })
    };

    let outcome = orchestrator.run(&session, target, lang).await;
    drop(orchestrator);
    let _ = progress.await;
    pb.finish_and_clear();

    let summary = match outcome? {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::AlreadyRunning => bail!("An OCR run is already in progress"),
    };

    let marker = if summary.paused_by_quota {
        style("!").yellow()
    } else {
        style("✓").green()
    };
    println!("{} {}", marker, summary.notice);
    if summary.total > 0 {
        println!(
            "  {} succeeded, {} failed, {} not attempted",
            summary.succeeded,
            summary.failed,
            summary.total - summary.processed()
        );
    }

    session.close().await;
    Ok(())
}
