//! HTTP request handlers for the API server.

mod helpers;
mod ocr;
mod preferences;
mod projects;
mod session;

// Re-export handlers for use by the router
pub use ocr::{ocr_status, start_ocr};
pub use preferences::{get_preferences, glyphs, put_preferences};
pub use projects::{
    create_project, delete_project, get_project, health, list_projects, open_project,
    update_project,
};
pub use session::{
    close_session, edit_page_text, export_project, get_page, get_selection, import_files,
    list_pages, put_selection, serve_handle, session_summary,
};
