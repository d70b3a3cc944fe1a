//! Exports: proofread text and JSON backups of a project.

use serde::{Deserialize, Serialize};

use crate::models::{OcrLanguage, Page, PageStatus, Project};

pub const BACKUP_NOTE: &str =
    "This backup does not include page images (kept local in the project database).";

/// Fallback file stem for untitled projects.
pub const DEFAULT_EXPORT_STEM: &str = "book";

/// Export formats offered to users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Txt,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Txt => "txt",
            Self::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Txt => "text/plain; charset=utf-8",
            Self::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupProject {
    pub id: String,
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub ocr_lang: OcrLanguage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPage {
    pub id: String,
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub status: PageStatus,
    pub ocr_text: String,
    pub corrected_text: String,
    pub last_error: String,
}

/// Image-free snapshot of a project and its pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub project: BackupProject,
    pub pages: Vec<BackupPage>,
    pub note: String,
}

fn ordered(pages: &[Page]) -> Vec<&Page> {
    let mut ordered: Vec<&Page> = pages.iter().collect();
    ordered.sort_by_key(|p| p.page_number);
    ordered
}

/// Join every page's effective text in page order, separated by blank lines.
pub fn plain_text(pages: &[Page]) -> String {
    ordered(pages)
        .into_iter()
        .map(|p| p.effective_text().trim_end())
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

pub fn backup(project: &Project, pages: &[Page]) -> Backup {
    Backup {
        project: BackupProject {
            id: project.id.clone(),
            title: project.title.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
            ocr_lang: project.ocr_lang,
        },
        pages: ordered(pages)
            .into_iter()
            .map(|p| BackupPage {
                id: p.id.clone(),
                page_number: p.page_number,
                width: p.width,
                height: p.height,
                status: p.status,
                ocr_text: p.ocr_text.clone(),
                corrected_text: p.corrected_text.clone(),
                last_error: p.last_error.clone(),
            })
            .collect(),
        note: BACKUP_NOTE.to_string(),
    }
}

/// Pretty-printed JSON backup.
pub fn json_backup(project: &Project, pages: &[Page]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&backup(project, pages))
}

/// Render a project in the given format.
pub fn render(
    format: ExportFormat,
    project: &Project,
    pages: &[Page],
) -> serde_json::Result<String> {
    match format {
        ExportFormat::Txt => Ok(plain_text(pages)),
        ExportFormat::Json => json_backup(project, pages),
    }
}

/// File stem derived from a title: anything outside `[A-Za-z0-9_-]`
/// collapses to a single underscore per run.
pub fn safe_stem(title: &str) -> String {
    if title.is_empty() {
        return DEFAULT_EXPORT_STEM.to_string();
    }

    let mut out = String::with_capacity(title.len());
    let mut in_run = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

pub fn export_filename(title: &str, format: ExportFormat) -> String {
    format!("{}.{}", safe_stem(title), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32, ocr: &str, corrected: &str) -> Page {
        let mut page = Page::new("p", n, 100, 200);
        page.ocr_text = ocr.to_string();
        page.corrected_text = corrected.to_string();
        page
    }

    #[test]
    fn test_plain_text_prefers_corrections_in_page_order() {
        let pages = vec![page(2, "B", ""), page(1, "ignored", "A")];
        assert_eq!(plain_text(&pages), "A\n\nB");
    }

    #[test]
    fn test_plain_text_trims() {
        let pages = vec![
            page(1, "", "  first  \n"),
            page(2, "", ""),
            page(3, "third\n\n", ""),
        ];
        assert_eq!(plain_text(&pages), "first\n\n\n\nthird");
        assert_eq!(plain_text(&[]), "");
    }

    #[test]
    fn test_backup_shape() {
        let project = Project::new("తెలుగు పుస్తకం", OcrLanguage::Tel);
        let mut second = page(2, "రెండు", "");
        second.status = PageStatus::Done;
        let pages = vec![second, page(1, "", "")];

        let json = json_backup(&project, &pages).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["project"]["ocrLang"], "tel");
        assert_eq!(value["project"]["title"], "తెలుగు పుస్తకం");
        assert_eq!(value["pages"][0]["pageNumber"], 1);
        assert_eq!(value["pages"][1]["status"], "done");
        assert_eq!(value["pages"][1]["ocrText"], "రెండు");
        assert!(value["pages"][0].get("projectId").is_none());
        assert_eq!(value["note"], BACKUP_NOTE);

        let parsed: Backup = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, backup(&project, &pages));
    }

    #[test]
    fn test_safe_stem() {
        assert_eq!(safe_stem("My Book: Vol 1"), "My_Book_Vol_1");
        assert_eq!(safe_stem("a--b_c"), "a--b_c");
        assert_eq!(safe_stem("తెలుగు"), "_");
        assert_eq!(safe_stem(""), "book");
        assert_eq!(export_filename("Notes", ExportFormat::Json), "Notes.json");
    }
}
