//! Page model and the per-page OCR state machine.

use serde::{Deserialize, Serialize};

/// OCR status of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Imported, never sent for OCR.
    #[default]
    New,
    /// Extraction request in flight.
    Processing,
    /// Last extraction succeeded.
    Done,
    /// Last extraction failed; see `last_error`.
    Error,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "processing" => Some(Self::Processing),
            "done" => Some(Self::Done),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Short label for page listings.
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Processing => "OCR…",
            Self::Done => "Done",
            Self::Error => "Error",
        }
    }
}

/// Raster image of a page as imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl PageImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// File extension matching the MIME type, used for display handles.
    pub fn extension(&self) -> &'static str {
        mime_guess::get_mime_extensions_str(&self.mime_type)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("bin")
    }
}

/// One scanned page with its OCR and corrected text.
///
/// The raster image is stored alongside the record but not carried here;
/// fetch it with `PageRepository::get_image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub project_id: String,
    /// 1-based position in the book.
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub status: PageStatus,
    pub ocr_text: String,
    pub corrected_text: String,
    pub last_error: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Page {
    /// Create a fresh page for a project.
    pub fn new(project_id: impl Into<String>, page_number: u32, width: u32, height: u32) -> Self {
        let now = crate::now_ms();
        Self {
            id: crate::new_id(),
            project_id: project_id.into(),
            page_number,
            width,
            height,
            status: PageStatus::New,
            ocr_text: String::new(),
            corrected_text: String::new(),
            last_error: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Text used for export and display: the correction, else the raw OCR.
    pub fn effective_text(&self) -> &str {
        if self.corrected_text.is_empty() {
            &self.ocr_text
        } else {
            &self.corrected_text
        }
    }

    /// Picked up by an OCR run.
    pub fn begin_processing(&mut self) {
        self.status = PageStatus::Processing;
        self.last_error.clear();
        self.touch();
    }

    /// Extraction succeeded. Existing corrections are kept.
    pub fn complete_ocr(&mut self, text: impl Into<String>) {
        let text = text.into();
        if self.corrected_text.is_empty() {
            self.corrected_text = text.clone();
        }
        self.ocr_text = text;
        self.status = PageStatus::Done;
        self.last_error.clear();
        self.touch();
    }

    /// Extraction failed. Texts are left as they were.
    pub fn fail_ocr(&mut self, message: impl Into<String>) {
        self.status = PageStatus::Error;
        self.last_error = message.into();
        self.touch();
    }

    /// Replace the corrected text with an edit.
    pub fn set_corrected_text(&mut self, text: impl Into<String>) {
        self.corrected_text = text.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = crate::now_ms().max(self.updated_at);
    }
}
