use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Root application configuration, loaded from `~/.config/geopub/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub harvest: HarvestConfig,
    pub openalex: OpenAlexConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Timeout for the single feed request, in seconds.
    pub feed_timeout_secs: u64,
    /// Timeout for each landing-page fetch, in seconds.
    pub page_timeout_secs: u64,
    /// Interval assigned to newly added sources, in minutes.
    pub default_interval_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub base_url: String,
    /// Courtesy contact address sent as the `mailto` query parameter.
    pub mailto: String,
    /// Minimum delay between outbound requests, in milliseconds.
    pub request_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    /// Name of the environment variable holding the SMTP password.
    pub password_env: String,
    pub from_address: String,
    pub use_starttls: bool,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("geopub");
        Self {
            data_path: data_dir.to_string_lossy().to_string(),
        }
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            feed_timeout_secs: 30,
            page_timeout_secs: 10,
            default_interval_minutes: 60 * 24,
        }
    }
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openalex.org".to_string(),
            mailto: "contact@example.org".to_string(),
            request_delay_ms: 100,
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: "localhost".to_string(),
            smtp_port: 587,
            username: String::new(),
            password_env: "GEOPUB_SMTP_PASSWORD".to_string(),
            from_address: "geopub@localhost".to_string(),
            use_starttls: true,
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/geopub/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("GEOPUB_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("geopub")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_path).join("geopub.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.openalex.request_delay_ms, 100);
        assert_eq!(cfg.harvest.page_timeout_secs, 10);
        assert!(!cfg.storage.data_path.is_empty());
        assert!(!cfg.email.enabled);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.openalex.mailto = "team@optimap.science".to_string();
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.openalex.mailto, "team@optimap.science");
        assert_eq!(loaded.harvest.feed_timeout_secs, cfg.harvest.feed_timeout_secs);
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_geopub_config.toml")).unwrap();
        assert_eq!(cfg.openalex.base_url, "https://api.openalex.org");
    }

    #[test]
    fn test_database_path() {
        let cfg = AppConfig::default();
        assert!(cfg.database_path().to_string_lossy().contains("geopub.db"));
    }
}
