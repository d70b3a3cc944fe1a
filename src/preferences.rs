//! UI preference entries.
//!
//! These mirror the layout the editor front end persists: a handful of
//! global settings plus per-page line hints and editor selections. Values
//! read back from storage are validated and clamped; anything unreadable
//! falls back to the default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{PreferenceRepository, RepositoryError};

/// Namespace shared by every preference key.
pub const KEY_PREFIX: &str = "book-ocr:v2";

pub const PANE_WIDTH_MIN: u32 = 320;
pub const PANE_WIDTH_MAX: u32 = 820;
pub const PANE_WIDTH_DEFAULT: u32 = 420;

pub const FONT_SIZE_MIN: u32 = 12;
pub const FONT_SIZE_MAX: u32 = 24;
pub const FONT_SIZE_DEFAULT: u32 = 15;

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("unknown preference '{0}'")]
    UnknownName(String),

    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CenterTab {
    /// Page image viewer.
    #[default]
    Viewer,
    /// Transliteration helper and script reference.
    Lang,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TranslitScheme {
    #[default]
    Itrans,
    Hk,
    Iast,
}

/// Global editor preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPreferences {
    pub right_pane_width: u32,
    pub editor_font_size: u32,
    pub theme_mode: ThemeMode,
    pub center_pane_tab: CenterTab,
    pub translit_scheme: TranslitScheme,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            right_pane_width: PANE_WIDTH_DEFAULT,
            editor_font_size: FONT_SIZE_DEFAULT,
            theme_mode: ThemeMode::default(),
            center_pane_tab: CenterTab::default(),
            translit_scheme: TranslitScheme::default(),
        }
    }
}

/// Names of the global preference entries, as stored.
pub const PREFERENCE_NAMES: [&str; 5] = [
    "rightPaneWidth",
    "editorFontSize",
    "themeMode",
    "centerPaneTab",
    "translitScheme",
];

impl UiPreferences {
    /// Load all global preferences, defaulting anything missing or invalid.
    pub fn load(repo: &PreferenceRepository) -> Result<Self, PreferenceError> {
        let mut prefs = Self::default();
        for name in PREFERENCE_NAMES {
            if let Some(raw) = repo.get(&global_key(name))? {
                if prefs.apply(name, &raw).is_err() {
                    tracing::debug!("Ignoring invalid stored preference {}={}", name, raw);
                }
            }
        }
        Ok(prefs)
    }

    /// Persist every global preference.
    pub fn save(&self, repo: &PreferenceRepository) -> Result<(), PreferenceError> {
        for name in PREFERENCE_NAMES {
            repo.set(&global_key(name), &self.value_of(name)?)?;
        }
        Ok(())
    }

    /// Parse and apply a single named value, clamping numeric ranges.
    pub fn apply(&mut self, name: &str, value: &str) -> Result<(), PreferenceError> {
        let invalid = || PreferenceError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let value = value.trim();
        match name {
            "rightPaneWidth" => {
                let width: i64 = value.parse().map_err(|_| invalid())?;
                self.right_pane_width = clamp_pane_width(width);
            }
            "editorFontSize" => {
                let size: i64 = value.parse().map_err(|_| invalid())?;
                self.editor_font_size = clamp_font_size(size);
            }
            "themeMode" => self.theme_mode = parse_choice(value).ok_or_else(invalid)?,
            "centerPaneTab" => self.center_pane_tab = parse_choice(value).ok_or_else(invalid)?,
            "translitScheme" => self.translit_scheme = parse_choice(value).ok_or_else(invalid)?,
            other => return Err(PreferenceError::UnknownName(other.to_string())),
        }
        Ok(())
    }

    /// Stored string form of a named value.
    pub fn value_of(&self, name: &str) -> Result<String, PreferenceError> {
        let value = match name {
            "rightPaneWidth" => self.right_pane_width.to_string(),
            "editorFontSize" => self.editor_font_size.to_string(),
            "themeMode" => choice_str(&self.theme_mode),
            "centerPaneTab" => choice_str(&self.center_pane_tab),
            "translitScheme" => choice_str(&self.translit_scheme),
            other => return Err(PreferenceError::UnknownName(other.to_string())),
        };
        Ok(value)
    }
}

pub fn clamp_pane_width(width: i64) -> u32 {
    width.clamp(PANE_WIDTH_MIN as i64, PANE_WIDTH_MAX as i64) as u32
}

pub fn clamp_font_size(size: i64) -> u32 {
    size.clamp(FONT_SIZE_MIN as i64, FONT_SIZE_MAX as i64) as u32
}

/// Clamp a line-hint ratio into 0..=1. NaN counts as the top of the page.
pub fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

fn parse_choice<T: clap::ValueEnum>(value: &str) -> Option<T> {
    T::from_str(value, true).ok()
}

fn choice_str<T: clap::ValueEnum>(value: &T) -> String {
    value
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default()
}

/// Last text selection in the editor, as character offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSelection {
    pub anchor: usize,
    pub head: usize,
}

impl EditorSelection {
    /// Clamp both offsets to a text of `len` characters.
    pub fn clamped(self, len: usize) -> Self {
        Self {
            anchor: self.anchor.min(len),
            head: self.head.min(len),
        }
    }
}

pub fn global_key(name: &str) -> String {
    format!("{}:{}", KEY_PREFIX, name)
}

pub fn line_hint_key(project_id: &str, page_id: &str) -> String {
    format!("{}:lineHintRatio:{}:{}", KEY_PREFIX, project_id, page_id)
}

pub fn selection_key(project_id: &str, page_id: &str) -> String {
    format!("{}:editorSelection:{}:{}", KEY_PREFIX, project_id, page_id)
}

/// Key prefixes of all per-page entries belonging to a project.
pub fn project_key_prefixes(project_id: &str) -> [String; 2] {
    [
        format!("{}:lineHintRatio:{}:", KEY_PREFIX, project_id),
        format!("{}:editorSelection:{}:", KEY_PREFIX, project_id),
    ]
}

/// Load a stored line hint, if present and readable.
pub fn load_line_hint(
    repo: &PreferenceRepository,
    project_id: &str,
    page_id: &str,
) -> Result<Option<f64>, PreferenceError> {
    let raw = repo.get(&line_hint_key(project_id, page_id))?;
    Ok(raw
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(clamp_ratio))
}

/// Load a stored editor selection, if present and readable.
pub fn load_selection(
    repo: &PreferenceRepository,
    project_id: &str,
    page_id: &str,
) -> Result<Option<EditorSelection>, PreferenceError> {
    let raw = repo.get(&selection_key(project_id, page_id))?;
    Ok(raw.and_then(|v| serde_json::from_str(&v).ok()))
}
