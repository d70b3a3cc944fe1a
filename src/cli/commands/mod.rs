//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod edit;
mod export;
mod glyphs;
mod helpers;
mod import;
mod init;
mod ocr;
mod prefs;
mod project;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};
use crate::export::ExportFormat;
use crate::models::OcrLanguage;

#[derive(Parser)]
#[command(name = "bookocr")]
#[command(about = "OCR proofreading workbench for scanned book pages")]
#[command(version)]
pub struct Cli {
    /// Data directory holding the project database (overrides config file)
    #[arg(long, short = 'd', global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// OCR service base URL
    #[arg(long, global = true, env = "BOOKOCR_API_BASE")]
    api_base: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Check that the rasterizer and OCR service are reachable
    Check,

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Import PDFs and images into a project
    Import {
        /// Project id, id prefix or title
        project: String,
        /// Files to import, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run OCR over a project's pages
    Ocr {
        /// Project id, id prefix or title
        project: String,
        /// Only this page number
        #[arg(short, long)]
        page: Option<u32>,
        /// OCR language (defaults to the project's)
        #[arg(short, long)]
        lang: Option<OcrLanguage>,
    },

    /// Replace a page's corrected text
    Edit {
        /// Project id, id prefix or title
        project: String,
        /// Page number
        page: u32,
        /// New text
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// Read the new text from a file ("-" for stdin)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Export a project's text or a JSON backup
    Export {
        /// Project id, id prefix or title
        project: String,
        #[arg(short, long, value_enum, default_value = "txt")]
        format: ExportFormat,
        /// Output path ("-" for stdout; default: <title>.<ext> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or change editor preferences
    Prefs {
        #[command(subcommand)]
        command: Option<PrefsCommands>,
    },

    /// Telugu glyph reference
    Glyphs {
        /// Consonant to show vowel forms for
        consonant: Option<String>,
    },

    /// Start the local API server
    Serve {
        /// Host to bind (default from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects, most recently used first
    List,
    /// Create a project
    New {
        /// Title (defaults to "Untitled Book")
        title: Option<String>,
        #[arg(short, long, default_value = "tel")]
        lang: OcrLanguage,
    },
    /// Show a project and its pages
    Show { project: String },
    /// Rename a project
    Rename { project: String, title: String },
    /// Set a project's OCR language
    Lang { project: String, lang: OcrLanguage },
    /// Delete a project with all its pages
    Delete {
        project: String,
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PrefsCommands {
    /// Print one preference, or all of them
    Get { name: Option<String> },
    /// Set a preference
    Set { name: String, value: String },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.data_dir,
        api_base: cli.api_base,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Check => init::cmd_check(&settings).await,
        Commands::Project { command } => match command {
            ProjectCommands::List => project::cmd_project_list(&settings).await,
            ProjectCommands::New { title, lang } => {
                project::cmd_project_new(&settings, title.as_deref(), lang).await
            }
            ProjectCommands::Show { project } => {
                project::cmd_project_show(&settings, &project).await
            }
            ProjectCommands::Rename { project, title } => {
                project::cmd_project_rename(&settings, &project, &title).await
            }
            ProjectCommands::Lang { project, lang } => {
                project::cmd_project_lang(&settings, &project, lang).await
            }
            ProjectCommands::Delete { project, yes } => {
                project::cmd_project_delete(&settings, &project, yes).await
            }
        },
        Commands::Import { project, files } => {
            import::cmd_import(&settings, &project, &files).await
        }
        Commands::Ocr {
            project,
            page,
            lang,
        } => ocr::cmd_ocr(&settings, &project, page, lang).await,
        Commands::Edit {
            project,
            page,
            text,
            file,
        } => edit::cmd_edit(&settings, &project, page, text, file.as_deref()).await,
        Commands::Export {
            project,
            format,
            output,
        } => export::cmd_export(&settings, &project, format, output.as_deref()).await,
        Commands::Prefs { command } => match command {
            None | Some(PrefsCommands::Get { name: None }) => prefs::cmd_prefs_list(&settings),
            Some(PrefsCommands::Get { name: Some(name) }) => {
                prefs::cmd_prefs_get(&settings, &name)
            }
            Some(PrefsCommands::Set { name, value }) => {
                prefs::cmd_prefs_set(&settings, &name, &value)
            }
        },
        Commands::Glyphs { consonant } => glyphs::cmd_glyphs(&settings, consonant.as_deref()),
        Commands::Serve { host, port } => serve::cmd_serve(&settings, host, port).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ocr_args() {
        let cli = Cli::try_parse_from(["bookocr", "ocr", "my-book", "--page", "3", "--lang", "kan"])
            .unwrap();
        match cli.command {
            Commands::Ocr { project, page, lang } => {
                assert_eq!(project, "my-book");
                assert_eq!(page, Some(3));
                assert_eq!(lang, Some(OcrLanguage::Kan));
            }
            _ => panic!("expected ocr command"),
        }
    }

    #[test]
    fn test_edit_needs_text_or_file() {
        assert!(Cli::try_parse_from(["bookocr", "edit", "b", "1"]).is_err());
        assert!(
            Cli::try_parse_from(["bookocr", "edit", "b", "1", "--text", "x", "--file", "f"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["bookocr", "edit", "b", "1", "--text", "x"]).is_ok());
    }
}
