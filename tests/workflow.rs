//! End-to-end proofreading workflow against a stand-in OCR service.
//!
//! A local axum server plays the extraction endpoint so the real HTTP client,
//! orchestrator, session and store are exercised together.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bookocr::export::plain_text;
use bookocr::import::{ImportError, ImportFile, ImportPipeline, RasterPage, Rasterizer};
use bookocr::models::{OcrLanguage, PageImage, PageStatus, Project};
use bookocr::ocr::{
    ExtractError, HttpOcrClient, OcrOrchestrator, RunOutcome, RunTarget, TextExtractor,
    QUOTA_PAUSED_NOTICE,
};
use bookocr::repository::Store;
use bookocr::session::ProofreadingSession;
use serde_json::json;
use tempfile::{tempdir, TempDir};

type Script = Arc<Mutex<FakeOcr>>;

/// Replies in order; once the script runs out every call succeeds.
#[derive(Default)]
struct FakeOcr {
    replies: VecDeque<(u16, serde_json::Value)>,
    langs: Vec<String>,
    uploads: usize,
}

async fn extract(
    State(script): State<Script>,
    Query(query): Query<HashMap<String, String>>,
    body: axum::body::Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut script = script.lock().unwrap();
    script.langs.push(query.get("lang").cloned().unwrap_or_default());
    if !body.is_empty() {
        script.uploads += 1;
    }
    let (status, reply) = script
        .replies
        .pop_front()
        .unwrap_or((200, json!({"status": "success", "text": "default"})));
    (StatusCode::from_u16(status).unwrap(), Json(reply))
}

async fn start_fake_ocr(replies: Vec<(u16, serde_json::Value)>) -> (String, Script) {
    let script: Script = Arc::new(Mutex::new(FakeOcr {
        replies: replies.into(),
        ..Default::default()
    }));
    let app = Router::new()
        .route("/extract", post(extract))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(script.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), script)
}

fn success(text: &str) -> (u16, serde_json::Value) {
    (200, json!({"status": "success", "text": text}))
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Stand-in for pdftoppm: "%PDF-N" rasterizes to N pages of width 100+i.
struct FakeRasterizer;

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<RasterPage>, ImportError> {
        let count: u32 = String::from_utf8_lossy(pdf)
            .trim_start_matches("%PDF-")
            .parse()
            .map_err(|_| ImportError::Rasterize("bad test pdf".to_string()))?;
        Ok((0..count)
            .map(|i| RasterPage {
                png: png(100 + i, 50),
                width: 100 + i,
                height: 50,
            })
            .collect())
    }
}

async fn new_project(pages: u32) -> (Store, Project, ProofreadingSession, TempDir) {
    let dir = tempdir().unwrap();
    let store = Store::open(&dir.path().join("books.db")).unwrap();
    let project = Project::new("Workflow", OcrLanguage::Tel);
    store.projects().upsert(&project).unwrap();

    let session = ProofreadingSession::open(store.clone(), &project.id, Duration::from_millis(350))
        .await
        .unwrap();
    if pages > 0 {
        let files: Vec<_> = (1..=pages)
            .map(|n| ImportFile::new(format!("scan-{}.png", n), png(10, 10)))
            .collect();
        let pipeline = ImportPipeline::new(Arc::new(FakeRasterizer), Duration::from_secs(5));
        session.import(&pipeline, &files).await.unwrap();
    }
    (store, project, session, dir)
}

#[tokio::test]
async fn imported_pages_are_numbered_in_file_then_page_order() {
    let (store, project, session, _dir) = new_project(2).await;
    let pipeline = ImportPipeline::new(Arc::new(FakeRasterizer), Duration::from_secs(5));

    let report = session
        .import(
            &pipeline,
            &[
                ImportFile::new("volume.pdf", b"%PDF-3".to_vec()),
                ImportFile::new("cover.png", png(40, 60)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(report.imported.len(), 4);
    assert_eq!(report.notices.last().unwrap(), "Imported 4 page(s).");

    let pages = store.pages().list_by_project(&project.id).unwrap();
    let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    let widths: Vec<u32> = pages.iter().map(|p| p.width).collect();
    assert_eq!(widths, vec![10, 10, 100, 101, 102, 40]);
    assert!(pages.iter().all(|p| p.status == PageStatus::New));

    let image = store.pages().get_image(&pages[5].id).unwrap().unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(image.bytes, png(40, 60));
}

#[tokio::test]
async fn ocr_over_http_preserves_corrections() {
    let (base, script) = start_fake_ocr(vec![success("first pass"), success("second pass")]).await;
    let (store, _project, session, _dir) = new_project(1).await;
    let client = HttpOcrClient::new(&base, Duration::from_secs(10)).unwrap();
    let orchestrator = OcrOrchestrator::new(Arc::new(client), Duration::from_secs(10));
    let page_id = session.pages().await[0].id.clone();

    orchestrator
        .run(&session, RunTarget::All, OcrLanguage::Tel)
        .await
        .unwrap();
    let page = session.page(&page_id).await.unwrap();
    assert_eq!(page.ocr_text, "first pass");
    assert_eq!(page.corrected_text, "first pass");

    session.edit_text(&page_id, "hand fixed").await.unwrap();
    orchestrator
        .run(&session, RunTarget::Page(page_id.clone()), OcrLanguage::Kan)
        .await
        .unwrap();
    session.close().await;

    let stored = store.pages().get(&page_id).unwrap().unwrap();
    assert_eq!(stored.ocr_text, "second pass");
    assert_eq!(stored.corrected_text, "hand fixed");
    assert_eq!(stored.status, PageStatus::Done);

    let script = script.lock().unwrap();
    assert_eq!(script.langs, vec!["tel", "kan"]);
    assert_eq!(script.uploads, 2);
}

#[tokio::test]
async fn quota_response_halts_the_run() {
    let (base, script) = start_fake_ocr(vec![
        success("one"),
        (500, json!({})),
        (429, json!({"error": "Daily quota exceeded"})),
    ])
    .await;
    let (store, project, session, _dir) = new_project(5).await;
    let client = HttpOcrClient::new(&base, Duration::from_secs(10)).unwrap();
    let orchestrator = OcrOrchestrator::new(Arc::new(client), Duration::from_secs(10));

    let outcome = orchestrator
        .run(&session, RunTarget::All, OcrLanguage::Tel)
        .await
        .unwrap();
    let RunOutcome::Completed(summary) = outcome else {
        panic!("run did not complete");
    };
    assert!(summary.paused_by_quota);
    assert_eq!(summary.notice, QUOTA_PAUSED_NOTICE);
    assert_eq!(script.lock().unwrap().langs.len(), 3);

    let pages = store.pages().list_by_project(&project.id).unwrap();
    assert_eq!(pages[0].status, PageStatus::Done);
    assert_eq!(pages[1].status, PageStatus::Error);
    assert_eq!(pages[1].last_error, "OCR failed with 500");
    assert_eq!(pages[2].status, PageStatus::Error);
    assert_eq!(pages[2].last_error, "Daily quota exceeded");
    for page in &pages[3..] {
        assert_eq!(page.status, PageStatus::New);
        assert!(page.ocr_text.is_empty());
        assert!(page.last_error.is_empty());
    }
}

#[tokio::test]
async fn http_client_maps_responses() {
    let (base, _script) = start_fake_ocr(vec![
        (200, json!({"status": "queued"})),
        (429, json!({})),
        (503, json!({"error": "model loading"})),
    ])
    .await;
    let client = HttpOcrClient::new(&format!("{}/", base), Duration::from_secs(10)).unwrap();
    let image = PageImage::new(png(2, 2), "image/png");

    client.health().await.unwrap();
    assert!(matches!(
        client.extract(&image, OcrLanguage::Hin).await,
        Err(ExtractError::UnexpectedResponse)
    ));

    let quota = client.extract(&image, OcrLanguage::Hin).await.unwrap_err();
    assert!(quota.is_quota());
    assert_eq!(quota.to_string(), "OCR failed with 429");

    let failed = client.extract(&image, OcrLanguage::Hin).await.unwrap_err();
    assert_eq!(failed.status(), Some(503));
    assert_eq!(failed.to_string(), "model loading");

    assert_eq!(
        client.extract(&image, OcrLanguage::Hin).await.unwrap(),
        "default"
    );
}

#[tokio::test]
async fn deleting_a_project_leaves_no_pages() {
    let (store, project, session, _dir) = new_project(3).await;
    let page_id = session.pages().await[0].id.clone();
    session.remember_line_hint(&page_id, 0.5).unwrap();
    session.close().await;

    assert!(store.projects().delete(&project.id).unwrap());
    assert_eq!(store.pages().count_by_project(&project.id).unwrap(), 0);
    assert!(store.pages().get(&page_id).unwrap().is_none());
    assert!(store
        .preferences()
        .list()
        .unwrap()
        .iter()
        .all(|(key, _)| !key.contains(&project.id)));
}

#[tokio::test]
async fn rapid_edits_coalesce_into_one_write() {
    let (store, _project, session, _dir) = new_project(1).await;
    let page_id = session.pages().await[0].id.clone();

    for text in ["r", "ra", "ram", "rama", "ramu"] {
        session.edit_text(&page_id, text).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(session.pending_writes(), 1);
    assert_eq!(store.pages().get(&page_id).unwrap().unwrap().corrected_text, "");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(session.pending_writes(), 0);
    assert_eq!(
        store.pages().get(&page_id).unwrap().unwrap().corrected_text,
        "ramu"
    );
}

#[tokio::test]
async fn plain_text_export_joins_pages() {
    let (store, project, session, _dir) = new_project(2).await;
    let pages = session.pages().await;
    session.edit_text(&pages[0].id, "A").await.unwrap();
    session
        .update_page(&pages[1].id, |p| p.ocr_text = "B".to_string())
        .await
        .unwrap();
    session.close().await;

    let stored = store.pages().list_by_project(&project.id).unwrap();
    assert_eq!(plain_text(&stored), "A\n\nB");
}
