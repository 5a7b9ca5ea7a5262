use crate::constants::PORTAL_URL;
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub browser: BrowserSettings,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub url: String,
    /// Wait for structurally required pages (menu, catalog list).
    pub default_timeout_ms: u64,
    /// Wait for a single discipline's detail block.
    pub detail_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: PORTAL_URL.to_string(),
            default_timeout_ms: 60_000,
            detail_timeout_ms: 8_000,
            poll_interval_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chromium_path: None,
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Libsql,
}

impl StoreBackend {
    /// Whether documents outlive the process.
    pub fn is_persistent(self) -> bool {
        matches!(self, StoreBackend::Libsql)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub libsql_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            libsql_path: "uerj.db".to_string(),
        }
    }
}

impl Config {
    /// Loads `config.toml` from the working directory, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at '{}', using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Fails for commands that only read or edit stored documents when the
    /// configured store starts empty on every run.
    pub fn require_persistent_store(&self, command: &str) -> Result<()> {
        if self.store.backend.is_persistent() {
            Ok(())
        } else {
            Err(ScraperError::Config(format!(
                "'{command}' needs a persistent store; set [store] backend = \"libsql\""
            )))
        }
    }

    fn validate(&self) -> Result<()> {
        if self.portal.url.trim().is_empty() {
            return Err(ScraperError::Config("portal.url must not be empty".to_string()));
        }
        if self.portal.detail_timeout_ms == 0 || self.portal.default_timeout_ms == 0 {
            return Err(ScraperError::Config("timeouts must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.portal.url, PORTAL_URL);
        assert_eq!(config.portal.detail_timeout_ms, 8_000);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[portal]\ndetail_timeout_ms = 5000\n\n[store]\nbackend = \"libsql\"\nlibsql_path = \"/tmp/x.db\""
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.portal.detail_timeout_ms, 5_000);
        assert_eq!(config.portal.default_timeout_ms, 60_000);
        assert_eq!(config.store.backend, StoreBackend::Libsql);
        assert_eq!(config.store.libsql_path, "/tmp/x.db");
    }

    #[test]
    fn test_memory_backend_is_not_persistent() {
        let config = Config::default();
        assert!(!config.store.backend.is_persistent());
        assert!(matches!(
            config.require_persistent_store("disciplines"),
            Err(ScraperError::Config(_))
        ));

        let mut config = Config::default();
        config.store.backend = StoreBackend::Libsql;
        assert!(config.require_persistent_store("disciplines").is_ok());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[portal]\ndetail_timeout_ms = 0").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ScraperError::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[portal\nurl = ").unwrap();
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ScraperError::Toml(_))
        ));
    }
}
