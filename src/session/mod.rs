//! Proofreading session: the open project's pages in memory.
//!
//! All page mutations go through the session, which reads and writes the
//! latest in-memory snapshot under one lock. Text edits apply to memory at
//! once and reach the database after a short idle window. Other transitions
//! are written through immediately.

mod debounce;
mod handles;
mod selection;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::import::{ImportFile, ImportPipeline, ImportReport};
use crate::models::{OcrLanguage, Page, PageImage, PageStatus, Project};
use crate::preferences::{
    clamp_ratio, line_hint_key, load_line_hint, load_selection, selection_key, EditorSelection,
    PreferenceError,
};
use crate::repository::{RepositoryError, Store};

pub use debounce::{Debouncer, FlushFn, FlushFuture};
pub use handles::{DisplayHandle, HandleRegistry};
pub use selection::{EditorSurface, RestoredView, FRAME, MAX_RESTORE_FRAMES};

/// Error recorded on pages left mid-OCR by a run that never finished.
pub const INTERRUPTED_MESSAGE: &str = "Interrupted before OCR finished";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Session is closed")]
    Closed,

    #[error(transparent)]
    Storage(#[from] RepositoryError),

    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error("Display handle error: {0}")]
    Handle(#[from] std::io::Error),
}

pub struct ProofreadingSession {
    store: Store,
    project_id: String,
    project: Arc<Mutex<Project>>,
    pages: Arc<Mutex<Vec<Page>>>,
    handles: Mutex<HandleRegistry>,
    debouncer: Debouncer,
    write_error: Arc<std::sync::Mutex<Option<String>>>,
    closed: AtomicBool,
}

impl ProofreadingSession {
    /// Load a project and its pages.
    ///
    /// Pages still marked `processing` belong to a run that died with the
    /// previous process; they are moved to `error` so they can be retried.
    pub async fn open(
        store: Store,
        project_id: &str,
        debounce: Duration,
    ) -> Result<Self, SessionError> {
        let project = store
            .projects()
            .get(project_id)?
            .ok_or_else(|| SessionError::ProjectNotFound(project_id.to_string()))?;

        let mut pages = store.pages().list_by_project(project_id)?;
        for page in pages
            .iter_mut()
            .filter(|p| p.status == PageStatus::Processing)
        {
            warn!("Page {} was left mid-OCR; marking as error", page.page_number);
            page.fail_ocr(INTERRUPTED_MESSAGE);
            store.pages().upsert(page)?;
        }

        let mut handles = HandleRegistry::new()?;
        for page in &pages {
            if let Some(image) = store.pages().get_image(&page.id)? {
                handles.acquire(&page.id, &image)?;
            }
        }

        info!(
            "Opened project '{}' with {} pages",
            project.title,
            pages.len()
        );

        let project = Arc::new(Mutex::new(project));
        let pages = Arc::new(Mutex::new(pages));
        let write_error = Arc::new(std::sync::Mutex::new(None));
        let flush = edit_flush(
            store.clone(),
            project.clone(),
            pages.clone(),
            write_error.clone(),
        );

        Ok(Self {
            store,
            project_id: project_id.to_string(),
            project,
            pages,
            handles: Mutex::new(handles),
            debouncer: Debouncer::new(debounce, flush),
            write_error,
            closed: AtomicBool::new(false),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn project(&self) -> Project {
        self.project.lock().await.clone()
    }

    /// Snapshot of all pages in page-number order.
    pub async fn pages(&self) -> Vec<Page> {
        self.pages.lock().await.clone()
    }

    pub async fn page(&self, page_id: &str) -> Option<Page> {
        self.pages
            .lock()
            .await
            .iter()
            .find(|p| p.id == page_id)
            .cloned()
    }

    pub async fn page_by_number(&self, page_number: u32) -> Option<Page> {
        self.pages
            .lock()
            .await
            .iter()
            .find(|p| p.page_number == page_number)
            .cloned()
    }

    /// Page number for the next imported page.
    ///
    /// Equal to the page count plus one unless earlier numbers are taken.
    pub async fn next_page_number(&self) -> u32 {
        let pages = self.pages.lock().await;
        let highest = pages.iter().map(|p| p.page_number).max().unwrap_or(0);
        (pages.len() as u32).max(highest) + 1
    }

    pub fn image(&self, page_id: &str) -> Result<Option<PageImage>, SessionError> {
        Ok(self.store.pages().get_image(page_id)?)
    }

    /// Apply a text edit in memory and schedule its durable write.
    pub async fn edit_text(&self, page_id: &str, text: &str) -> Result<Page, SessionError> {
        self.ensure_open()?;
        let page = {
            let mut pages = self.pages.lock().await;
            let page = pages
                .iter_mut()
                .find(|p| p.id == page_id)
                .ok_or_else(|| SessionError::PageNotFound(page_id.to_string()))?;
            page.set_corrected_text(text);
            page.clone()
        };
        self.debouncer.schedule(page_id);
        Ok(page)
    }

    /// Read-modify-write a page against the latest snapshot and persist it.
    ///
    /// Returns None if the page is no longer part of the session. This keeps
    /// working after `close` so a run that outlives its view still records
    /// its results.
    pub async fn update_page<F>(&self, page_id: &str, f: F) -> Result<Option<Page>, SessionError>
    where
        F: FnOnce(&mut Page),
    {
        let mut pages = self.pages.lock().await;
        let Some(page) = pages.iter_mut().find(|p| p.id == page_id) else {
            return Ok(None);
        };
        f(page);
        self.store.pages().upsert(page)?;
        Ok(Some(page.clone()))
    }

    /// Import files and merge the new pages into the session.
    pub async fn import(
        &self,
        pipeline: &ImportPipeline,
        files: &[ImportFile],
    ) -> Result<ImportReport, SessionError> {
        self.ensure_open()?;
        let first = self.next_page_number().await;
        let batch = pipeline.run(&self.project_id, first, files).await;

        let mut report = ImportReport {
            imported: Vec::new(),
            skipped: batch.skipped,
            failures: batch.failures,
            notices: batch.notices,
        };
        if batch.pages.is_empty() {
            return Ok(report);
        }

        let imported = self.merge_imported(batch.pages).await?;
        report
            .notices
            .push(format!("Imported {} page(s).", imported.len()));
        report.imported = imported;
        Ok(report)
    }

    /// Persist new pages in one write, then add them to memory in page order
    /// with display handles.
    pub async fn merge_imported(
        &self,
        batch: Vec<(Page, PageImage)>,
    ) -> Result<Vec<Page>, SessionError> {
        self.ensure_open()?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        self.store.pages().bulk_insert(&batch)?;
        self.touch_project().await?;

        {
            let mut handles = self.handles.lock().await;
            for (page, image) in &batch {
                handles.acquire(&page.id, image)?;
            }
        }

        let imported: Vec<Page> = batch.into_iter().map(|(page, _)| page).collect();
        let mut pages = self.pages.lock().await;
        pages.extend(imported.iter().cloned());
        pages.sort_by_key(|p| p.page_number);
        Ok(imported)
    }

    pub async fn rename(&self, title: &str) -> Result<Project, SessionError> {
        self.update_project(|project| project.title = title.to_string())
            .await
    }

    pub async fn set_language(&self, lang: OcrLanguage) -> Result<Project, SessionError> {
        self.update_project(|project| project.ocr_lang = lang).await
    }

    /// Bump the project's `updated_at` and persist it.
    pub async fn touch_project(&self) -> Result<Project, SessionError> {
        self.update_project(|_| {}).await
    }

    async fn update_project<F>(&self, f: F) -> Result<Project, SessionError>
    where
        F: FnOnce(&mut Project),
    {
        let mut project = self.project.lock().await;
        f(&mut project);
        project.touch();
        if !self.store.projects().update(&project)? {
            warn!(
                "Project {} was deleted; keeping the change in memory only",
                self.project_id
            );
        }
        Ok(project.clone())
    }

    pub fn remember_selection(
        &self,
        page_id: &str,
        selection: EditorSelection,
    ) -> Result<(), SessionError> {
        let value = serde_json::to_string(&selection).map_err(|e| {
            PreferenceError::InvalidValue {
                name: "editorSelection".to_string(),
                value: e.to_string(),
            }
        })?;
        self.store
            .preferences()
            .set(&selection_key(&self.project_id, page_id), &value)?;
        Ok(())
    }

    /// Remember where in the page the cursor's line sits. Clamped to 0..=1.
    pub fn remember_line_hint(&self, page_id: &str, ratio: f64) -> Result<f64, SessionError> {
        let ratio = clamp_ratio(ratio);
        self.store.preferences().set(
            &line_hint_key(&self.project_id, page_id),
            &ratio.to_string(),
        )?;
        Ok(ratio)
    }

    pub fn remembered_selection(
        &self,
        page_id: &str,
    ) -> Result<(Option<EditorSelection>, Option<f64>), SessionError> {
        let prefs = self.store.preferences();
        Ok((
            load_selection(prefs, &self.project_id, page_id)?,
            load_line_hint(prefs, &self.project_id, page_id)?,
        ))
    }

    /// Restore the remembered selection into `surface` once it is ready.
    pub async fn restore_selection(
        &self,
        page_id: &str,
        surface: &dyn EditorSurface,
    ) -> Result<Option<RestoredView>, SessionError> {
        let (selection, line_hint) = self.remembered_selection(page_id)?;
        if selection.is_none() && line_hint.is_none() {
            return Ok(None);
        }
        Ok(selection::restore_when_ready(surface, selection, line_hint).await)
    }

    pub async fn handle(&self, page_id: &str) -> Option<DisplayHandle> {
        self.handles.lock().await.get(page_id).cloned()
    }

    pub async fn handle_by_id(&self, handle_id: &str) -> Option<DisplayHandle> {
        self.handles.lock().await.find(handle_id).cloned()
    }

    /// Replace a page's display handle with a fresh one.
    pub async fn refresh_handle(&self, page_id: &str) -> Result<DisplayHandle, SessionError> {
        self.ensure_open()?;
        let image = self
            .image(page_id)?
            .ok_or_else(|| SessionError::PageNotFound(page_id.to_string()))?;
        Ok(self.handles.lock().await.acquire(page_id, &image)?)
    }

    pub async fn live_handles(&self) -> usize {
        self.handles.lock().await.live_count()
    }

    pub fn pending_writes(&self) -> usize {
        self.debouncer.pending_count()
    }

    /// Take the last background write failure, if any.
    pub fn take_write_error(&self) -> Option<String> {
        self.write_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Write all pending edits now.
    pub async fn flush(&self) -> usize {
        self.debouncer.flush_all().await
    }

    /// Flush pending edits and release every display handle.
    pub async fn close(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);
        let flushed = self.flush().await;
        let released = self.handles.lock().await.release_all();
        debug!(
            "Closed session for {} ({} writes flushed, {} handles released)",
            self.project_id, flushed, released
        );
        released
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }
}

fn edit_flush(
    store: Store,
    project: Arc<Mutex<Project>>,
    pages: Arc<Mutex<Vec<Page>>>,
    write_error: Arc<std::sync::Mutex<Option<String>>>,
) -> FlushFn {
    Arc::new(move |page_id: String| -> FlushFuture {
        let store = store.clone();
        let project = project.clone();
        let pages = pages.clone();
        let write_error = write_error.clone();
        Box::pin(async move {
            if let Err(e) = persist_edit(&store, &project, &pages, &page_id).await {
                warn!("Failed to save page {}: {}", page_id, e);
                *write_error.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(format!("Failed to save page: {}", e));
            }
        })
    })
}

/// Write the latest in-memory record of an edited page and bump the project.
///
/// A page whose row has gone missing is an error: the edit was not saved.
async fn persist_edit(
    store: &Store,
    project: &Mutex<Project>,
    pages: &Mutex<Vec<Page>>,
    page_id: &str,
) -> Result<(), SessionError> {
    {
        let pages = pages.lock().await;
        let Some(page) = pages.iter().find(|p| p.id == page_id) else {
            return Ok(());
        };
        if !store.pages().upsert(page)? {
            return Err(SessionError::PageNotFound(page_id.to_string()));
        }
    }

    let mut project = project.lock().await;
    project.touch();
    store.projects().update(&project)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::encode_png;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    async fn setup(page_count: u32) -> (ProofreadingSession, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        let project = Project::new("Book", OcrLanguage::Tel);
        store.projects().upsert(&project).unwrap();

        let batch: Vec<_> = (1..=page_count)
            .map(|n| {
                (
                    Page::new(&project.id, n, 4, 4),
                    PageImage::new(encode_png(4, 4), "image/png"),
                )
            })
            .collect();
        store.pages().bulk_insert(&batch).unwrap();

        let session = ProofreadingSession::open(store, &project.id, Duration::from_millis(350))
            .await
            .unwrap();
        (session, dir)
    }

    #[tokio::test]
    async fn test_open_missing_project() {
        let dir = tempdir().unwrap();
        let store = Store::open(&dir.path().join("test.db")).unwrap();
        let err = ProofreadingSession::open(store, "gone", Duration::from_millis(350))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_open_acquires_handles_and_close_releases_them() {
        let (session, _dir) = setup(3).await;
        assert_eq!(session.live_handles().await, 3);

        let page = session.pages().await[0].clone();
        let first = session.handle(&page.id).await.unwrap();
        let second = session.refresh_handle(&page.id).await.unwrap();
        assert!(!first.path.exists());
        assert!(second.path.exists());
        assert_eq!(session.live_handles().await, 3);

        assert_eq!(session.close().await, 3);
        assert_eq!(session.live_handles().await, 0);
        assert!(!second.path.exists());
    }

    #[tokio::test]
    async fn test_open_recovers_interrupted_pages() {
        let (session, _dir) = setup(2).await;
        let page = session.pages().await[1].clone();
        session
            .update_page(&page.id, |p| p.begin_processing())
            .await
            .unwrap();
        let store = session.store().clone();
        let project_id = session.project_id().to_string();
        session.close().await;

        let reopened = ProofreadingSession::open(store.clone(), &project_id, Duration::from_millis(350))
            .await
            .unwrap();
        let recovered = reopened.page(&page.id).await.unwrap();
        assert_eq!(recovered.status, PageStatus::Error);
        assert_eq!(recovered.last_error, INTERRUPTED_MESSAGE);
        assert_eq!(
            store.pages().get(&page.id).unwrap().unwrap().status,
            PageStatus::Error
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_is_immediate_in_memory_and_debounced_on_disk() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();
        let before = session.project().await.updated_at;

        session.edit_text(&page.id, "draft").await.unwrap();
        assert_eq!(session.page(&page.id).await.unwrap().corrected_text, "draft");
        assert_eq!(
            session.store().pages().get(&page.id).unwrap().unwrap().corrected_text,
            ""
        );
        assert_eq!(session.pending_writes(), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        let stored = session.store().pages().get(&page.id).unwrap().unwrap();
        assert_eq!(stored.corrected_text, "draft");
        assert_eq!(session.pending_writes(), 0);

        let project = session
            .store()
            .projects()
            .get(session.project_id())
            .unwrap()
            .unwrap();
        assert!(project.updated_at >= before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_edit() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();

        session.edit_text(&page.id, "last words").await.unwrap();
        session.close().await;

        let stored = session.store().pages().get(&page.id).unwrap().unwrap();
        assert_eq!(stored.corrected_text, "last words");
        assert!(matches!(
            session.edit_text(&page.id, "too late").await,
            Err(SessionError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_edit_unknown_page() {
        let (session, _dir) = setup(1).await;
        assert!(matches!(
            session.edit_text("nope", "x").await,
            Err(SessionError::PageNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_page_uses_latest_snapshot() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();

        session.edit_text(&page.id, "manual fix").await.unwrap();
        let updated = session
            .update_page(&page.id, |p| p.complete_ocr("machine text"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.corrected_text, "manual fix");
        let stored = session.store().pages().get(&page.id).unwrap().unwrap();
        assert_eq!(stored.corrected_text, "manual fix");
        assert_eq!(stored.ocr_text, "machine text");
        assert!(session.update_page("gone", |_| {}).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_page_number_skips_taken_numbers() {
        let (session, _dir) = setup(3).await;
        assert_eq!(session.next_page_number().await, 4);

        let last = session.page_by_number(3).await.unwrap();
        session.update_page(&last.id, |p| p.page_number = 9).await.unwrap();
        assert_eq!(session.next_page_number().await, 10);
    }

    #[tokio::test]
    async fn test_merge_imported_sorts_and_acquires_handles() {
        let (session, _dir) = setup(1).await;
        let before = session.project().await.updated_at;
        let batch: Vec<_> = [3, 2]
            .into_iter()
            .map(|n| {
                (
                    Page::new(session.project_id(), n, 4, 4),
                    PageImage::new(encode_png(4, 4), "image/png"),
                )
            })
            .collect();

        let imported = session.merge_imported(batch).await.unwrap();
        assert_eq!(imported.len(), 2);

        let numbers: Vec<_> = session.pages().await.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(session.live_handles().await, 3);
        assert_eq!(
            session.store().pages().count_by_project(session.project_id()).unwrap(),
            3
        );
        assert!(session.project().await.updated_at >= before);
    }

    #[tokio::test]
    async fn test_rename_and_language_persist() {
        let (session, _dir) = setup(0).await;
        session.rename("Maha Bharatam").await.unwrap();
        session.set_language(OcrLanguage::Kan).await.unwrap();

        let stored = session
            .store()
            .projects()
            .get(session.project_id())
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "Maha Bharatam");
        assert_eq!(stored.ocr_lang, OcrLanguage::Kan);
    }

    #[tokio::test]
    async fn test_writes_after_delete_do_not_recreate_project() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();
        let store = session.store().clone();
        session.close().await;
        assert!(store.projects().delete(session.project_id()).unwrap());

        let project = session.set_language(OcrLanguage::Hin).await.unwrap();
        assert_eq!(project.ocr_lang, OcrLanguage::Hin);
        session.touch_project().await.unwrap();
        assert!(session
            .update_page(&page.id, |p| p.fail_ocr("late"))
            .await
            .unwrap()
            .is_some());

        assert!(store.projects().get(session.project_id()).unwrap().is_none());
        assert!(store.projects().list().unwrap().is_empty());
        assert!(store.pages().get(&page.id).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_background_save_is_reported() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();
        let conn = rusqlite::Connection::open(session.store().database_path()).unwrap();
        conn.execute("DELETE FROM pages WHERE id = ?1", [&page.id])
            .unwrap();

        session.edit_text(&page.id, "lost").await.unwrap();
        assert!(session.take_write_error().is_none());
        tokio::time::sleep(Duration::from_millis(400)).await;

        let error = session.take_write_error().unwrap();
        assert!(error.starts_with("Failed to save page"));
        assert!(error.contains(&page.id));
        assert!(session.take_write_error().is_none());
    }

    struct FakeEditor {
        ready_after: usize,
        polls: AtomicUsize,
        applied: std::sync::Mutex<Option<EditorSelection>>,
        scrolled: std::sync::Mutex<Option<f64>>,
    }

    impl FakeEditor {
        fn new(ready_after: usize) -> Self {
            Self {
                ready_after,
                polls: AtomicUsize::new(0),
                applied: std::sync::Mutex::new(None),
                scrolled: std::sync::Mutex::new(None),
            }
        }
    }

    impl EditorSurface for FakeEditor {
        fn is_ready(&self) -> bool {
            self.polls.fetch_add(1, Ordering::SeqCst) + 1 >= self.ready_after
        }

        fn text_len(&self) -> usize {
            10
        }

        fn set_selection(&self, selection: EditorSelection) {
            *self.applied.lock().unwrap() = Some(selection);
        }

        fn scroll_to_ratio(&self, ratio: f64) {
            *self.scrolled.lock().unwrap() = Some(ratio);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_restored_once_editor_ready() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();

        session
            .remember_selection(&page.id, EditorSelection { anchor: 3, head: 40 })
            .unwrap();
        assert_eq!(session.remember_line_hint(&page.id, 1.5).unwrap(), 1.0);

        let editor = FakeEditor::new(5);
        let restored = session
            .restore_selection(&page.id, &editor)
            .await
            .unwrap()
            .unwrap();

        let expected = EditorSelection { anchor: 3, head: 10 };
        assert_eq!(restored.selection, Some(expected));
        assert_eq!(*editor.applied.lock().unwrap(), Some(expected));
        assert_eq!(*editor.scrolled.lock().unwrap(), Some(1.0));
        assert_eq!(editor.polls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_restore_gives_up() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();
        session.remember_line_hint(&page.id, 0.25).unwrap();

        let editor = FakeEditor::new(usize::MAX);
        assert!(session
            .restore_selection(&page.id, &editor)
            .await
            .unwrap()
            .is_none());
        assert!(editor.scrolled.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nothing_remembered() {
        let (session, _dir) = setup(1).await;
        let page = session.pages().await[0].clone();
        let editor = FakeEditor::new(1);
        assert!(session
            .restore_selection(&page.id, &editor)
            .await
            .unwrap()
            .is_none());
        assert_eq!(editor.polls.load(Ordering::SeqCst), 0);
    }
}
