//! Error mapping and shared lookups for handlers.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::super::AppState;
use crate::models::{Page, Project};
use crate::preferences::PreferenceError;
use crate::repository::RepositoryError;
use crate::session::{ProofreadingSession, SessionError};

pub const NO_OPEN_PROJECT: &str = "No project is open";
pub const RUN_IN_PROGRESS: &str = "An OCR run is in progress";

/// Error body returned by every endpoint: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        }
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<PreferenceError> for ApiError {
    fn from(e: PreferenceError) -> Self {
        match e {
            PreferenceError::Storage(e) => e.into(),
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::ProjectNotFound(_) | SessionError::PageNotFound(_) => {
                Self::not_found(e.to_string())
            }
            SessionError::Closed => Self::conflict(e.to_string()),
            SessionError::Preference(e) => e.into(),
            SessionError::Storage(e) => e.into(),
            SessionError::Handle(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        }
    }
}

/// The open session, or 409.
pub async fn require_session(state: &AppState) -> ApiResult<Arc<ProofreadingSession>> {
    state
        .current_session()
        .await
        .ok_or_else(|| ApiError::conflict(NO_OPEN_PROJECT))
}

/// Whether a run is active or about to start.
pub async fn run_active(state: &AppState) -> bool {
    state.orchestrator.is_running() || state.run_status.read().await.running
}

/// Whether an active run is working on `project_id`, open or not.
pub async fn run_targets(state: &AppState, project_id: &str) -> bool {
    if !run_active(state).await {
        return false;
    }
    let running_on = state.run_status.read().await.project_id.clone();
    let open = state
        .current_session()
        .await
        .map(|s| s.project_id().to_string());
    running_on.as_deref() == Some(project_id) || open.as_deref() == Some(project_id)
}

/// The open project with its pages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub project: Project,
    pub pages: Vec<Page>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl SessionView {
    pub async fn of(session: &ProofreadingSession) -> Self {
        Self {
            project: session.project().await,
            pages: session.pages().await,
            save_error: None,
        }
    }
}
