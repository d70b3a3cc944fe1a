//! Sequential OCR runs over a session's pages.
//!
//! Pages are sent one at a time in the order given. Each transition is
//! applied to the session's latest snapshot of that page and written
//! immediately. A quota response (HTTP 429) stops the run; any other failure
//! is recorded on its page and the run moves on. Only one run may be active
//! per orchestrator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::client::{ExtractError, TextExtractor};
use crate::models::OcrLanguage;
use crate::session::{ProofreadingSession, SessionError};

pub const QUOTA_PAUSED_NOTICE: &str = "OCR paused: daily quota exceeded (429).";
pub const NO_PAGES_NOTICE: &str = "No pages to OCR.";
pub const FINISHED_NOTICE: &str = "OCR finished.";
pub const MISSING_IMAGE_MESSAGE: &str = "Page image is missing";

/// Which pages a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunTarget {
    /// Every page of the project, in page order.
    All,
    /// A single page by id.
    Page(String),
    /// Explicit page ids, in the order given.
    Pages(Vec<String>),
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        total: usize,
    },
    PageStarted {
        index: usize,
        total: usize,
        page_id: String,
        page_number: u32,
    },
    PageDone {
        page_id: String,
        page_number: u32,
    },
    PageFailed {
        page_id: String,
        page_number: u32,
        message: String,
    },
    QuotaHalted {
        page_id: String,
        message: String,
    },
    Finished {
        summary: RunSummary,
    },
}

/// What a completed run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub paused_by_quota: bool,
    pub notice: String,
}

impl RunSummary {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run was active; nothing was done.
    AlreadyRunning,
    Completed(RunSummary),
}

pub struct OcrOrchestrator {
    extractor: Arc<dyn TextExtractor>,
    timeout: Duration,
    running: AtomicBool,
    paused_by_quota: AtomicBool,
    events: Option<UnboundedSender<RunEvent>>,
}

/// Clears the running flag however the run ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OcrOrchestrator {
    pub fn new(extractor: Arc<dyn TextExtractor>, timeout: Duration) -> Self {
        Self {
            extractor,
            timeout,
            running: AtomicBool::new(false),
            paused_by_quota: AtomicBool::new(false),
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether the last run stopped on a quota response.
    pub fn paused_by_quota(&self) -> bool {
        self.paused_by_quota.load(Ordering::SeqCst)
    }

    fn emit(&self, event: RunEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }

    /// Run OCR over `target` pages of `session` using `lang`.
    ///
    /// Storage failures abort the run and are returned; extraction failures
    /// are recorded on their pages.
    pub async fn run(
        &self,
        session: &ProofreadingSession,
        target: RunTarget,
        lang: OcrLanguage,
    ) -> Result<RunOutcome, SessionError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("OCR run requested while one is active; ignoring");
            return Ok(RunOutcome::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        self.paused_by_quota.store(false, Ordering::SeqCst);

        let page_ids = resolve_target(session, target).await;
        let total = page_ids.len();
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };

        if total == 0 {
            summary.notice = NO_PAGES_NOTICE.to_string();
            self.emit(RunEvent::Finished {
                summary: summary.clone(),
            });
            return Ok(RunOutcome::Completed(summary));
        }

        info!("Starting OCR run over {} pages ({})", total, lang);
        self.emit(RunEvent::Started { total });

        for (index, page_id) in page_ids.iter().enumerate() {
            let Some(page) = session
                .update_page(page_id, |p| p.begin_processing())
                .await?
            else {
                debug!("Page {} left the session; skipping", page_id);
                continue;
            };
            self.emit(RunEvent::PageStarted {
                index,
                total,
                page_id: page.id.clone(),
                page_number: page.page_number,
            });

            let image = match session.image(page_id) {
                Ok(image) => image,
                Err(e) => {
                    abandon_page(session, page_id, page.page_number, &e).await;
                    return Err(e);
                }
            };
            let result = match image {
                Some(image) => {
                    match tokio::time::timeout(self.timeout, self.extractor.extract(&image, lang))
                        .await
                    {
                        Ok(result) => result,
                        Err(_) => Err(ExtractError::Timeout(self.timeout.as_secs())),
                    }
                }
                None => Err(ExtractError::Request(MISSING_IMAGE_MESSAGE.to_string())),
            };

            match result {
                Ok(text) => {
                    if let Err(e) = session
                        .update_page(page_id, |p| p.complete_ocr(text))
                        .await
                    {
                        abandon_page(session, page_id, page.page_number, &e).await;
                        return Err(e);
                    }
                    summary.succeeded += 1;
                    self.emit(RunEvent::PageDone {
                        page_id: page.id.clone(),
                        page_number: page.page_number,
                    });
                }
                Err(e) => {
                    let message = e.to_string();
                    session
                        .update_page(page_id, |p| p.fail_ocr(message.clone()))
                        .await?;
                    summary.failed += 1;

                    if e.is_quota() {
                        warn!("Quota exceeded on page {}; pausing run", page.page_number);
                        self.paused_by_quota.store(true, Ordering::SeqCst);
                        summary.paused_by_quota = true;
                        self.emit(RunEvent::QuotaHalted {
                            page_id: page.id.clone(),
                            message,
                        });
                        break;
                    }

                    warn!("OCR failed on page {}: {}", page.page_number, message);
                    self.emit(RunEvent::PageFailed {
                        page_id: page.id.clone(),
                        page_number: page.page_number,
                        message,
                    });
                }
            }
        }

        session.set_language(lang).await?;

        summary.notice = if summary.paused_by_quota {
            QUOTA_PAUSED_NOTICE.to_string()
        } else {
            FINISHED_NOTICE.to_string()
        };
        info!(
            "OCR run ended: {} done, {} failed{}",
            summary.succeeded,
            summary.failed,
            if summary.paused_by_quota {
                " (quota)"
            } else {
                ""
            }
        );
        self.emit(RunEvent::Finished {
            summary: summary.clone(),
        });
        Ok(RunOutcome::Completed(summary))
    }
}

/// Mark a page failed after a storage error ended its extraction, so it is
/// not left `processing`.
async fn abandon_page(
    session: &ProofreadingSession,
    page_id: &str,
    page_number: u32,
    cause: &SessionError,
) {
    warn!("Storage error on page {}: {}", page_number, cause);
    let message = cause.to_string();
    if let Err(e) = session.update_page(page_id, |p| p.fail_ocr(message)).await {
        warn!("Could not record failure of page {}: {}", page_number, e);
    }
}

async fn resolve_target(session: &ProofreadingSession, target: RunTarget) -> Vec<String> {
    match target {
        RunTarget::All => session.pages().await.into_iter().map(|p| p.id).collect(),
        RunTarget::Page(id) => session
            .page(&id)
            .await
            .map(|p| vec![p.id])
            .unwrap_or_default(),
        RunTarget::Pages(ids) => ids,
    }
}
