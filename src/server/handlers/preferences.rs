//! Preference and script reference endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::super::AppState;
use super::helpers::ApiResult;
use crate::preferences::UiPreferences;
use crate::script::{self, GlyphForm, TypingExample};

pub async fn get_preferences(State(state): State<AppState>) -> ApiResult<Json<UiPreferences>> {
    Ok(Json(UiPreferences::load(state.store.preferences())?))
}

/// Update named preferences. All values are validated before any is saved.
pub async fn put_preferences(
    State(state): State<AppState>,
    Json(values): Json<serde_json::Map<String, serde_json::Value>>,
) -> ApiResult<Json<UiPreferences>> {
    let repo = state.store.preferences();
    let mut prefs = UiPreferences::load(repo)?;
    for (name, value) in &values {
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        prefs.apply(name, &raw)?;
    }
    prefs.save(repo)?;
    Ok(Json(prefs))
}

#[derive(Debug, Deserialize)]
pub struct GlyphParams {
    pub consonant: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphTables {
    pub consonants: Vec<char>,
    pub consonant: String,
    pub vowel_forms: Vec<GlyphForm>,
    pub conjuncts: Vec<String>,
    pub typing_examples: &'static [TypingExample],
}

/// Telugu reference tables, with vowel forms for one consonant.
pub async fn glyphs(Query(params): Query<GlyphParams>) -> Json<GlyphTables> {
    let consonants = script::consonants();
    let consonant = params
        .consonant
        .filter(|c| !c.is_empty())
        .or_else(|| consonants.first().map(|c| c.to_string()))
        .unwrap_or_default();

    Json(GlyphTables {
        vowel_forms: script::vowel_forms(&consonant),
        consonants,
        consonant,
        conjuncts: script::common_conjuncts(),
        typing_examples: &script::TYPING_EXAMPLES,
    })
}
