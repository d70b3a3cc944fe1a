//! Project endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::super::AppState;
use super::helpers::{run_active, run_targets, ApiError, ApiResult, SessionView, RUN_IN_PROGRESS};
use crate::models::{OcrLanguage, Project};
use crate::session::ProofreadingSession;

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParams {
    pub title: Option<String>,
    pub ocr_lang: Option<OcrLanguage>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub page_count: u64,
    pub open: bool,
}

/// Projects, most recently used first.
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.store.projects().list()?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(params): Json<ProjectParams>,
) -> ApiResult<impl IntoResponse> {
    let project = Project::new(
        params.title.unwrap_or_default(),
        params.ocr_lang.unwrap_or_default(),
    );
    state.store.projects().upsert(&project)?;
    info!("Created project '{}' ({})", project.title, project.id);
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetail>> {
    let project = state
        .store
        .projects()
        .get(&project_id)?
        .ok_or_else(|| ApiError::not_found(format!("Project not found: {}", project_id)))?;
    let page_count = state.store.pages().count_by_project(&project_id)?;
    let open = state
        .current_session()
        .await
        .is_some_and(|s| s.project_id() == project_id);

    Ok(Json(ProjectDetail {
        project,
        page_count,
        open,
    }))
}

/// Rename or change the OCR language. Goes through the session when the
/// project is open so its in-memory copy stays current.
pub async fn update_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(params): Json<ProjectParams>,
) -> ApiResult<Json<Project>> {
    if let Some(session) = state
        .current_session()
        .await
        .filter(|s| s.project_id() == project_id)
    {
        let mut project = session.project().await;
        if let Some(ref title) = params.title {
            project = session.rename(title).await?;
        }
        if let Some(lang) = params.ocr_lang {
            project = session.set_language(lang).await?;
        }
        return Ok(Json(project));
    }

    let repo = state.store.projects();
    let mut project = repo
        .get(&project_id)?
        .ok_or_else(|| ApiError::not_found(format!("Project not found: {}", project_id)))?;
    if let Some(title) = params.title {
        project.title = title;
    }
    if let Some(lang) = params.ocr_lang {
        project.ocr_lang = lang;
    }
    project.touch();
    repo.upsert(&project)?;
    Ok(Json(project))
}

/// Delete a project and everything under it. Requires `?confirm=true`.
pub async fn delete_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<StatusCode> {
    if !params.confirm {
        return Err(ApiError::bad_request(
            "Deleting a project removes all its pages; pass confirm=true",
        ));
    }

    // A run outlives a closed session and writes back when it ends.
    if run_targets(&state, &project_id).await {
        return Err(ApiError::conflict(RUN_IN_PROGRESS));
    }
    let is_open = state
        .current_session()
        .await
        .is_some_and(|s| s.project_id() == project_id);
    if is_open {
        state.close_session().await;
    }

    if state.store.projects().delete(&project_id)? {
        info!("Deleted project {}", project_id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!(
            "Project not found: {}",
            project_id
        )))
    }
}

/// Open a project, closing whichever one was open before.
pub async fn open_project(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    if run_active(&state).await {
        return Err(ApiError::conflict(RUN_IN_PROGRESS));
    }

    let session = ProofreadingSession::open(
        state.store.clone(),
        &project_id,
        state.settings.edit_debounce(),
    )
    .await?;

    let mut slot = state.session.write().await;
    if let Some(previous) = slot.take() {
        previous.close().await;
    }
    let view = SessionView::of(&session).await;
    *slot = Some(std::sync::Arc::new(session));
    Ok(Json(view))
}
