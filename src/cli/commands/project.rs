//! Project management commands.

use console::style;

use crate::config::Settings;
use crate::models::{OcrLanguage, PageStatus, Project};

use super::helpers::{format_ms, open_store, resolve_project, short_id, truncate};

/// List projects, most recently used first.
pub async fn cmd_project_list(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let projects = store.projects().list()?;

    if projects.is_empty() {
        println!(
            "{} No projects yet. Create one with 'bookocr project new <title>'.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Projects").bold());
    println!("{}", "-".repeat(72));
    println!(
        "{:<10} {:<32} {:<6} {:>6}  Updated",
        "ID", "Title", "Lang", "Pages"
    );
    println!("{}", "-".repeat(72));

    for project in projects {
        let pages = store.pages().count_by_project(&project.id)?;
        println!(
            "{:<10} {:<32} {:<6} {:>6}  {}",
            short_id(&project.id),
            truncate(&project.title, 31),
            project.ocr_lang.as_str(),
            pages,
            format_ms(project.updated_at)
        );
    }

    Ok(())
}

pub async fn cmd_project_new(
    settings: &Settings,
    title: Option<&str>,
    lang: OcrLanguage,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let project = Project::new(title.unwrap_or_default(), lang);
    store.projects().upsert(&project)?;

    println!(
        "{} Created project '{}' ({})",
        style("✓").green(),
        project.title,
        project.id
    );
    Ok(())
}

/// Show a project with a summary line per page.
pub async fn cmd_project_show(settings: &Settings, key: &str) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let project = resolve_project(&store, key)?;
    let pages = store.pages().list_by_project(&project.id)?;

    println!("\n{}", style(&project.title).bold());
    println!("  ID:       {}", project.id);
    println!(
        "  Language: {} ({})",
        project.ocr_lang.label(),
        project.ocr_lang
    );
    println!("  Created:  {}", format_ms(project.created_at));
    println!("  Updated:  {}", format_ms(project.updated_at));

    let count = |status: PageStatus| pages.iter().filter(|p| p.status == status).count();
    println!(
        "  Pages:    {} ({} done, {} error, {} new)",
        pages.len(),
        count(PageStatus::Done),
        count(PageStatus::Error),
        count(PageStatus::New)
    );

    if pages.is_empty() {
        return Ok(());
    }

    println!("\n{:>5}  {:<7} {:>11} {:>7}  Note", "Page", "Status", "Size", "Chars");
    println!("{}", "-".repeat(60));
    for page in &pages {
        let status = match page.status {
            PageStatus::Done => style(page.status.label()).green(),
            PageStatus::Error => style(page.status.label()).red(),
            PageStatus::Processing => style(page.status.label()).yellow(),
            PageStatus::New => style(page.status.label()).dim(),
        };
        let note = if page.status == PageStatus::Error {
            truncate(&page.last_error, 40)
        } else if !page.corrected_text.is_empty() && page.corrected_text != page.ocr_text {
            "edited".to_string()
        } else {
            String::new()
        };
        println!(
            "{:>5}  {:<7} {:>11} {:>7}  {}",
            page.page_number,
            status,
            format!("{}x{}", page.width, page.height),
            page.effective_text().chars().count(),
            note
        );
    }

    Ok(())
}

pub async fn cmd_project_rename(settings: &Settings, key: &str, title: &str) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let mut project = resolve_project(&store, key)?;
    let old = std::mem::replace(&mut project.title, title.to_string());
    project.touch();
    store.projects().upsert(&project)?;

    println!(
        "{} Renamed '{}' to '{}'",
        style("✓").green(),
        old,
        project.title
    );
    Ok(())
}

pub async fn cmd_project_lang(
    settings: &Settings,
    key: &str,
    lang: OcrLanguage,
) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let mut project = resolve_project(&store, key)?;
    project.ocr_lang = lang;
    project.touch();
    store.projects().upsert(&project)?;

    println!(
        "{} '{}' will be OCR'd as {}",
        style("✓").green(),
        project.title,
        lang.label()
    );
    Ok(())
}

/// Delete a project and its pages. Does nothing without `--yes`.
pub async fn cmd_project_delete(settings: &Settings, key: &str, yes: bool) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let project = resolve_project(&store, key)?;
    let pages = store.pages().count_by_project(&project.id)?;

    if !yes {
        println!(
            "{} This will permanently delete '{}' and its {} page(s).",
            style("!").yellow(),
            project.title,
            pages
        );
        println!("  Re-run with --yes to confirm.");
        return Ok(());
    }

    store.projects().delete(&project.id)?;
    println!(
        "{} Deleted '{}' ({} page(s))",
        style("✓").green(),
        project.title,
        pages
    );
    Ok(())
}
