//! Project model and OCR language codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Title given to projects created without one.
pub const DEFAULT_PROJECT_TITLE: &str = "Untitled Book";

/// Language codes accepted by the OCR service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    /// Telugu.
    #[default]
    Tel,
    /// Kannada.
    Kan,
    /// Hindi.
    Hin,
    /// English.
    Eng,
}

impl OcrLanguage {
    pub const ALL: [OcrLanguage; 4] = [Self::Tel, Self::Kan, Self::Hin, Self::Eng];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tel => "tel",
            Self::Kan => "kan",
            Self::Hin => "hin",
            Self::Eng => "eng",
        }
    }

    /// Human-readable label, e.g. "Telugu (tel)".
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tel => "Telugu (tel)",
            Self::Kan => "Kannada (kan)",
            Self::Hin => "Hindi (hin)",
            Self::Eng => "English (eng)",
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tel" => Ok(Self::Tel),
            "kan" => Ok(Self::Kan),
            "hin" => Ok(Self::Hin),
            "eng" => Ok(Self::Eng),
            other => Err(format!(
                "unsupported OCR language '{}' (allowed: tel, kan, hin, eng)",
                other
            )),
        }
    }
}

/// A book-scanning unit of work grouping ordered pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    pub ocr_lang: OcrLanguage,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub updated_at: i64,
}

impl Project {
    /// Create a new project. A blank title falls back to the default.
    pub fn new(title: impl Into<String>, ocr_lang: OcrLanguage) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            DEFAULT_PROJECT_TITLE.to_string()
        } else {
            title
        };
        let now = crate::now_ms();
        Self {
            id: crate::new_id(),
            title,
            ocr_lang,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at` so the project sorts as most recently used.
    pub fn touch(&mut self) {
        self.updated_at = crate::now_ms().max(self.updated_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!("tel".parse::<OcrLanguage>().unwrap(), OcrLanguage::Tel);
        assert_eq!(" HIN ".parse::<OcrLanguage>().unwrap(), OcrLanguage::Hin);
        assert!("fra".parse::<OcrLanguage>().is_err());
    }

    #[test]
    fn test_language_serde_codes() {
        let json = serde_json::to_string(&OcrLanguage::Kan).unwrap();
        assert_eq!(json, "\"kan\"");
    }

    #[test]
    fn test_new_project_defaults() {
        let project = Project::new("  ", OcrLanguage::default());
        assert_eq!(project.title, DEFAULT_PROJECT_TITLE);
        assert_eq!(project.ocr_lang, OcrLanguage::Tel);
        assert_eq!(project.created_at, project.updated_at);
    }
}
