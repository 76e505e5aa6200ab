use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
///
/// Loaded from the config file, then overridden by environment variables.
/// A missing file is not an error - everything has a default, and the
/// defaults resolve to the mock provider so the app always starts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend: BackendConfig,
    pub store: StoreConfig,
}

/// Which backend we might talk to
///
/// All three values may be absent or placeholders; the provider selector
/// sorts out what that means.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    /// Hosted REST backend base URL
    pub url: Option<String>,
    /// API key for the hosted backend
    pub api_key: Option<String>,
    /// Direct Postgres connection string
    pub connection_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Path of the local persistence database; defaults under the user data
    /// directory when unset
    pub path: Option<String>,
}

impl Config {
    /// Load config from the default location, apply env overrides
    pub fn load() -> crate::Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)
                .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Environment wins over the file, same as every sensible tool
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MAISON_BACKEND_URL") {
            self.backend.url = Some(url);
        }
        if let Ok(key) = std::env::var("MAISON_BACKEND_KEY") {
            self.backend.api_key = Some(key);
        }
        if let Ok(conn) = std::env::var("MAISON_DATABASE_URL") {
            self.backend.connection_string = Some(conn);
        }
        if let Ok(path) = std::env::var("MAISON_STORE_PATH") {
            self.store.path = Some(path);
        }
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)?;
        Ok(())
    }

    /// Where the local persistence database lives
    pub fn store_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.store.path {
            return Ok(PathBuf::from(path));
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::Config("Could not find data directory".into()))?
            .join("maison");
        Ok(data_dir.join("store.db"))
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("Could not find config directory".into()))?
            .join("maison");

        Ok(config_dir.join("config.toml"))
    }
}
