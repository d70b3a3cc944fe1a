//! Endpoints acting on the open project.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::super::AppState;
use super::helpers::{require_session, ApiError, ApiResult, SessionView};
use crate::export::{export_filename, render, ExportFormat};
use crate::import::{ImportFile, ImportReport};
use crate::models::Page;
use crate::preferences::EditorSelection;

/// The open project. Carries `saveError` once if a background save failed.
pub async fn session_summary(State(state): State<AppState>) -> ApiResult<Json<SessionView>> {
    let session = require_session(&state).await?;
    let mut view = SessionView::of(&session).await;
    view.save_error = session.take_write_error();
    Ok(Json(view))
}

/// Close the open project, flushing pending edits.
pub async fn close_session(State(state): State<AppState>) -> impl IntoResponse {
    let closed = state.close_session().await;
    Json(serde_json::json!({ "closed": closed }))
}

pub async fn list_pages(State(state): State<AppState>) -> ApiResult<Json<Vec<Page>>> {
    let session = require_session(&state).await?;
    Ok(Json(session.pages().await))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDetail {
    #[serde(flatten)]
    pub page: Page,
    pub image_url: Option<String>,
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> ApiResult<Json<PageDetail>> {
    let session = require_session(&state).await?;
    let page = session
        .page(&page_id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Page not found: {}", page_id)))?;
    let image_url = session
        .handle(&page_id)
        .await
        .map(|h| format!("/api/handles/{}", h.id));
    Ok(Json(PageDetail { page, image_url }))
}

#[derive(Debug, Deserialize)]
pub struct EditText {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditedPage {
    #[serde(flatten)]
    pub page: Page,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

/// Replace a page's corrected text. The write to disk is debounced, so a
/// failure from an earlier edit is reported with this one.
pub async fn edit_page_text(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(body): Json<EditText>,
) -> ApiResult<Json<EditedPage>> {
    let session = require_session(&state).await?;
    let page = session.edit_text(&page_id, &body.text).await?;
    Ok(Json(EditedPage {
        page,
        save_error: session.take_write_error(),
    }))
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionView {
    pub selection: Option<EditorSelection>,
    pub line_hint: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionUpdate {
    pub anchor: Option<usize>,
    pub head: Option<usize>,
    pub line_hint: Option<f64>,
}

async fn selection_view(state: &AppState, page_id: &str) -> ApiResult<SelectionView> {
    let session = require_session(state).await?;
    if session.page(page_id).await.is_none() {
        return Err(ApiError::not_found(format!("Page not found: {}", page_id)));
    }
    let (selection, line_hint) = session.remembered_selection(page_id)?;
    Ok(SelectionView {
        selection,
        line_hint,
    })
}

pub async fn get_selection(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
) -> ApiResult<Json<SelectionView>> {
    Ok(Json(selection_view(&state, &page_id).await?))
}

/// Remember the editor selection and/or line hint for a page.
pub async fn put_selection(
    State(state): State<AppState>,
    Path(page_id): Path<String>,
    Json(update): Json<SelectionUpdate>,
) -> ApiResult<Json<SelectionView>> {
    let session = require_session(&state).await?;
    if session.page(&page_id).await.is_none() {
        return Err(ApiError::not_found(format!("Page not found: {}", page_id)));
    }

    if let Some(anchor) = update.anchor {
        let head = update.head.unwrap_or(anchor);
        session.remember_selection(&page_id, EditorSelection { anchor, head })?;
    }
    if let Some(ratio) = update.line_hint {
        session.remember_line_hint(&page_id, ratio)?;
    }
    Ok(Json(selection_view(&state, &page_id).await?))
}

/// Import uploaded PDFs and images into the open project.
pub async fn import_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ImportReport>> {
    let session = require_session(&state).await?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        let name = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("upload")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        files.push(ImportFile::new(name, bytes.to_vec()));
    }

    Ok(Json(session.import(&state.pipeline, &files).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub format: ExportFormat,
}

pub async fn export_project(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let session = require_session(&state).await?;
    let project = session.project().await;
    let pages = session.pages().await;

    let body = render(params.format, &project, &pages).map_err(|e| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(&project.title, params.format)
    );

    Ok((
        [
            (header::CONTENT_TYPE, params.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// Serve a page image through its display handle.
pub async fn serve_handle(
    State(state): State<AppState>,
    Path(handle_id): Path<String>,
) -> ApiResult<Response> {
    let not_found = || ApiError::not_found(format!("Image not found: {}", handle_id));

    let session = state.current_session().await.ok_or_else(not_found)?;
    let handle = session.handle_by_id(&handle_id).await.ok_or_else(not_found)?;
    let content = tokio::fs::read(&handle.path)
        .await
        .map_err(|_| not_found())?;

    Ok(([(header::CONTENT_TYPE, handle.mime_type)], content).into_response())
}
