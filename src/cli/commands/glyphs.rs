//! Glyph reference command.

use console::style;

use crate::config::Settings;
use crate::preferences::{TranslitScheme, UiPreferences};
use crate::repository::Store;
use crate::script;

/// Print the Telugu reference tables. Typing hints follow the saved
/// transliteration scheme when a database exists.
pub fn cmd_glyphs(settings: &Settings, consonant: Option<&str>) -> anyhow::Result<()> {
    let scheme = if settings.database_exists() {
        let store = Store::open(&settings.database_path())?;
        UiPreferences::load(store.preferences())?.translit_scheme
    } else {
        TranslitScheme::default()
    };

    let consonants = script::consonants();
    let consonant = consonant
        .map(str::to_string)
        .or_else(|| consonants.first().map(|c| c.to_string()))
        .unwrap_or_default();

    println!("\n{}", style("Consonants").bold());
    let row: Vec<String> = consonants.iter().map(|c| c.to_string()).collect();
    for chunk in row.chunks(12) {
        println!("  {}", chunk.join("  "));
    }

    println!("\n{} {}", style("Vowel forms of").bold(), consonant);
    for form in script::vowel_forms(&consonant) {
        println!("  {:<6} {}", form.glyph, style(form.label).dim());
    }

    println!("\n{}", style("Common conjuncts").bold());
    let conjuncts = script::common_conjuncts();
    for chunk in conjuncts.chunks(8) {
        println!("  {}", chunk.join("  "));
    }

    println!("\n{}", style("Typing examples").bold());
    for example in script::TYPING_EXAMPLES.iter() {
        println!(
            "  {:<8} {}",
            example.glyph,
            style(example.input_for(scheme)).cyan()
        );
    }

    Ok(())
}
