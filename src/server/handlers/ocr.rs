//! OCR run endpoints.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::{error, info};

use super::super::{AppState, RunStatus};
use super::helpers::{require_session, ApiError, ApiResult, RUN_IN_PROGRESS};
use crate::models::OcrLanguage;
use crate::ocr::{RunOutcome, RunTarget};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOcr {
    /// Only this page; all pages when absent.
    pub page_id: Option<String>,
    pub page_number: Option<u32>,
    /// Defaults to the project's language.
    pub lang: Option<OcrLanguage>,
}

/// Start an OCR run over the open project in the background.
pub async fn start_ocr(
    State(state): State<AppState>,
    body: Option<Json<StartOcr>>,
) -> ApiResult<(StatusCode, Json<RunStatus>)> {
    let params = body.map(|Json(b)| b).unwrap_or_default();
    let session = require_session(&state).await?;

    let target = match (params.page_id, params.page_number) {
        (Some(id), _) => {
            if session.page(&id).await.is_none() {
                return Err(ApiError::not_found(format!("Page not found: {}", id)));
            }
            RunTarget::Page(id)
        }
        (None, Some(number)) => {
            let page = session.page_by_number(number).await.ok_or_else(|| {
                ApiError::not_found(format!("Page {} not found", number))
            })?;
            RunTarget::Page(page.id)
        }
        (None, None) => RunTarget::All,
    };
    let lang = match params.lang {
        Some(lang) => lang,
        None => session.project().await.ocr_lang,
    };

    let snapshot = {
        let mut status = state.run_status.write().await;
        if status.running || state.orchestrator.is_running() {
            return Err(ApiError::conflict(RUN_IN_PROGRESS));
        }
        *status = RunStatus {
            running: true,
            project_id: Some(session.project_id().to_string()),
            ..Default::default()
        };
        status.clone()
    };

    info!("Starting background OCR run ({})", lang);
    let orchestrator = state.orchestrator.clone();
    let run_status = state.run_status.clone();
    tokio::spawn(async move {
        let outcome = orchestrator.run(&session, target, lang).await;
        let mut status = run_status.write().await;
        status.running = false;
        status.current_page = None;
        match outcome {
            Ok(RunOutcome::Completed(summary)) => status.summary = Some(summary),
            Ok(RunOutcome::AlreadyRunning) => status.error = Some(RUN_IN_PROGRESS.to_string()),
            Err(e) => {
                error!("OCR run aborted: {}", e);
                status.error = Some(e.to_string());
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

pub async fn ocr_status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.run_status.read().await.clone())
}
