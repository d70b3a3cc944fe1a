//! Router configuration for the API server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Upload ceiling for one import request.
const MAX_IMPORT_BYTES: usize = 512 * 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        // Projects
        .route(
            "/api/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/api/projects/:project_id",
            get(handlers::get_project)
                .patch(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/api/projects/:project_id/open", post(handlers::open_project))
        // Open session
        .route("/api/session", get(handlers::session_summary))
        .route("/api/session/close", post(handlers::close_session))
        .route("/api/session/pages", get(handlers::list_pages))
        .route("/api/session/pages/:page_id", get(handlers::get_page))
        .route("/api/session/pages/:page_id/text", put(handlers::edit_page_text))
        .route(
            "/api/session/pages/:page_id/selection",
            get(handlers::get_selection).put(handlers::put_selection),
        )
        .route(
            "/api/session/import",
            post(handlers::import_files).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route(
            "/api/session/ocr",
            get(handlers::ocr_status).post(handlers::start_ocr),
        )
        .route("/api/session/export", get(handlers::export_project))
        // Page images by display handle
        .route("/api/handles/:handle_id", get(handlers::serve_handle))
        // Preferences and script reference
        .route(
            "/api/preferences",
            get(handlers::get_preferences).put(handlers::put_preferences),
        )
        .route("/api/glyphs", get(handlers::glyphs))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
