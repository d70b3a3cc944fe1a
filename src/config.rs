//! Configuration management for bookocr using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "bookocr.db";

/// Default OCR service base URL.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// Environment variable overriding the OCR service base URL.
pub const API_BASE_ENV: &str = "BOOKOCR_API_BASE";

/// Idle window before an edited page is written to disk.
pub const DEFAULT_EDIT_DEBOUNCE_MS: u64 = 350;

/// Rasterization resolution: 2x the 72 DPI PDF user space.
pub const DEFAULT_RASTER_DPI: u32 = 144;

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename.
    pub database_filename: String,
    /// Base URL of the OCR extraction service.
    pub api_base: String,
    /// OCR request timeout in seconds.
    pub request_timeout: u64,
    /// PDF rasterization timeout in seconds.
    pub rasterize_timeout: u64,
    /// Debounce window for edited text, in milliseconds.
    pub edit_debounce_ms: u64,
    /// Resolution used when rasterizing PDF pages.
    pub raster_dpi: u32,
    /// Host for the local API server.
    pub server_host: String,
    /// Port for the local API server.
    pub server_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bookocr");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: 120,
            rasterize_timeout: 120,
            edit_debounce_ms: DEFAULT_EDIT_DEBOUNCE_MS,
            raster_dpi: DEFAULT_RASTER_DPI,
            server_host: "127.0.0.1".to_string(),
            server_port: 3030,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the full path to the database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database appears to be initialized.
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn rasterize_timeout(&self) -> Duration {
        Duration::from_secs(self.rasterize_timeout)
    }

    pub fn edit_debounce(&self) -> Duration {
        Duration::from_millis(self.edit_debounce_ms)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// OCR service base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// OCR request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// PDF rasterization timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rasterize_timeout: Option<u64>,
    /// Edit debounce window in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_debounce_ms: Option<u64>,
    /// PDF rasterization resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_dpi: Option<u32>,
    /// API server host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_host: Option<String>,
    /// API server port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_port: Option<u16>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers bookocr config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("bookocr").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            // No config file found
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref api_base) = self.api_base {
            settings.api_base = api_base.clone();
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(timeout) = self.rasterize_timeout {
            settings.rasterize_timeout = timeout;
        }
        if let Some(debounce) = self.edit_debounce_ms {
            settings.edit_debounce_ms = debounce;
        }
        if let Some(dpi) = self.raster_dpi {
            settings.raster_dpi = dpi;
        }
        if let Some(ref host) = self.server_host {
            settings.server_host = host.clone();
        }
        if let Some(port) = self.server_port {
            settings.server_port = port;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Default)]
pub struct LoadOptions {
    /// Explicit config file path (skips discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory override from the command line.
    pub data_dir: Option<PathBuf>,
    /// OCR service base URL override from the command line.
    pub api_base: Option<String>,
}

/// Load settings: defaults, then config file, then environment, then CLI.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let config = match options.config_path {
        Some(ref path) => match Config::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}", e);
                Config::default()
            }
        },
        None => Config::load().await,
    };

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    if let Some(api_base) = std::env::var(API_BASE_ENV).ok().filter(|s| !s.is_empty()) {
        tracing::debug!("Using {} from environment: {}", API_BASE_ENV, api_base);
        settings.api_base = api_base;
    }

    if let Some(data_dir) = options.data_dir {
        let expanded = shellexpand::tilde(&data_dir.to_string_lossy()).into_owned();
        settings.data_dir = PathBuf::from(expanded);
    }
    if let Some(api_base) = options.api_base {
        settings.api_base = api_base;
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_and_apply() {
        let config = Config::parse(
            r#"
            data_dir = "books"
            api_base = "http://ocr.local:9000/"
            request_timeout = 30
            edit_debounce_ms = 500
            "#,
            Path::new("bookocr.toml"),
        )
        .unwrap();

        let mut settings = Settings::with_data_dir(PathBuf::from("/tmp/x"));
        config.apply_to_settings(&mut settings, Path::new("/srv"));

        assert_eq!(settings.data_dir, PathBuf::from("/srv/books"));
        assert_eq!(settings.api_base, "http://ocr.local:9000/");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.edit_debounce(), Duration::from_millis(500));
        assert_eq!(settings.raster_dpi, DEFAULT_RASTER_DPI);
    }

    #[test]
    fn test_parse_yaml_and_json() {
        let yaml = Config::parse("server_port: 4000\n", Path::new("c.yaml")).unwrap();
        assert_eq!(yaml.server_port, Some(4000));

        let json = Config::parse(r#"{"raster_dpi": 200}"#, Path::new("c.json")).unwrap();
        assert_eq!(json.raster_dpi, Some(200));

        assert!(Config::parse("not = [valid", Path::new("c.toml")).is_err());
    }

    #[test]
    fn test_absolute_path_not_rebased() {
        let config = Config::default();
        assert_eq!(
            config.resolve_path("/var/books", Path::new("/srv")),
            PathBuf::from("/var/books")
        );
    }

    #[tokio::test]
    async fn test_load_from_path_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookocr.json");
        std::fs::write(&path, r#"{"database": "other.db"}"#).unwrap();

        let config = Config::load_from_path(&path).await.unwrap();
        assert_eq!(config.database.as_deref(), Some("other.db"));
        assert_eq!(config.base_dir(), Some(dir.path().to_path_buf()));
    }
}
