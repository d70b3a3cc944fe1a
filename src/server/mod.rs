//! Local JSON API for the proofreading workbench.
//!
//! One project is open at a time. Its session owns the in-memory pages,
//! display handles and pending edits; OCR runs execute in the background
//! against that session and report progress through `/api/session/ocr`.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

use crate::config::Settings;
use crate::import::ImportPipeline;
use crate::ocr::{HttpOcrClient, OcrOrchestrator, RunEvent, RunSummary, TextExtractor};
use crate::repository::Store;
use crate::session::ProofreadingSession;

/// Progress of the current or last OCR run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatus {
    pub running: bool,
    pub project_id: Option<String>,
    pub total: usize,
    pub processed: usize,
    /// Page number being extracted right now.
    pub current_page: Option<u32>,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub settings: Arc<Settings>,
    pub pipeline: ImportPipeline,
    pub orchestrator: Arc<OcrOrchestrator>,
    /// The open project, if any.
    pub session: Arc<RwLock<Option<Arc<ProofreadingSession>>>>,
    /// OCR run progress (only one run at a time).
    pub run_status: Arc<RwLock<RunStatus>>,
}

impl AppState {
    /// Build state and start the task that folds run events into
    /// `run_status`. Must be called inside a tokio runtime.
    pub fn new(
        store: Store,
        settings: Settings,
        pipeline: ImportPipeline,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator =
            OcrOrchestrator::new(extractor, settings.request_timeout()).with_events(tx);
        let run_status = Arc::new(RwLock::new(RunStatus::default()));
        tokio::spawn(track_run_events(rx, run_status.clone()));

        Self {
            store,
            settings: Arc::new(settings),
            pipeline,
            orchestrator: Arc::new(orchestrator),
            session: Arc::new(RwLock::new(None)),
            run_status,
        }
    }

    /// State wired to the configured database, OCR endpoint and rasterizer.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        settings.ensure_directories()?;
        let store = Store::open(&settings.database_path())?;
        let client = HttpOcrClient::from_settings(settings)?;
        Ok(Self::new(
            store,
            settings.clone(),
            ImportPipeline::from_settings(settings),
            Arc::new(client),
        ))
    }

    /// The open session, if any.
    pub async fn current_session(&self) -> Option<Arc<ProofreadingSession>> {
        self.session.read().await.clone()
    }

    /// Close the open session, flushing its edits.
    pub async fn close_session(&self) -> Option<String> {
        let session = self.session.write().await.take()?;
        session.close().await;
        Some(session.project_id().to_string())
    }
}

async fn track_run_events(
    mut rx: mpsc::UnboundedReceiver<RunEvent>,
    status: Arc<RwLock<RunStatus>>,
) {
    while let Some(event) = rx.recv().await {
        let mut status = status.write().await;
        match event {
            RunEvent::Started { total } => {
                status.total = total;
                status.processed = 0;
            }
            RunEvent::PageStarted { page_number, .. } => {
                status.current_page = Some(page_number);
            }
            RunEvent::PageDone { .. }
            | RunEvent::PageFailed { .. }
            | RunEvent::QuotaHalted { .. } => {
                status.processed += 1;
                status.current_page = None;
            }
            RunEvent::Finished { .. } => {
                status.current_page = None;
            }
        }
    }
}

/// Start the API server and serve until interrupted.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings)?;
    let app = create_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    if let Some(project_id) = state.close_session().await {
        tracing::info!("Closed session for project {}", project_id);
    }
    Ok(())
}
