//! Preference commands.

use console::style;

use crate::config::Settings;
use crate::preferences::{UiPreferences, PREFERENCE_NAMES};

use super::helpers::open_store;

pub fn cmd_prefs_list(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let prefs = UiPreferences::load(store.preferences())?;

    for name in PREFERENCE_NAMES {
        println!("{:<16} {}", name, prefs.value_of(name)?);
    }
    Ok(())
}

pub fn cmd_prefs_get(settings: &Settings, name: &str) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let prefs = UiPreferences::load(store.preferences())?;
    println!("{}", prefs.value_of(name)?);
    Ok(())
}

/// Set a preference. Numeric values are clamped to their allowed range.
pub fn cmd_prefs_set(settings: &Settings, name: &str, value: &str) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let mut prefs = UiPreferences::load(store.preferences())?;
    prefs.apply(name, value)?;
    prefs.save(store.preferences())?;

    println!(
        "{} {} = {}",
        style("✓").green(),
        name,
        prefs.value_of(name)?
    );
    Ok(())
}
