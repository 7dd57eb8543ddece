//! Configuration management for pwakit

pub mod schema;

pub use schema::Config;

use crate::error::{PwaError, PwaResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Project config file name
pub const CONFIG_FILE: &str = "pwakit.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager for `pwakit.toml` in the given project directory
    pub fn new(project_dir: &Path) -> Self {
        Self {
            config_path: project_dir.join(CONFIG_FILE),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Walk up from `start` looking for a `pwakit.toml`
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, falling back to defaults if the file does not exist
    pub async fn load(&self) -> PwaResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> PwaResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PwaError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| PwaError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> PwaResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PwaError::io(format!("creating {}", parent.display()), e))?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            PwaError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Directory the config file lives in; relative app paths resolve against it
    pub fn project_dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());

        let config = manager.load().await.unwrap();
        assert_eq!(config.worker.sw, "sw.js");
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());

        let mut config = Config::default();
        config.app.base_path = "/docs".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.app.base_path, "/docs");
    }

    #[tokio::test]
    async fn invalid_toml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "[app\nbase_path = ").unwrap();

        let err = ConfigManager::with_path(path).load().await.unwrap_err();
        assert!(matches!(err, PwaError::ConfigInvalid { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn find_project_config_walks_up() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "").unwrap();
        let nested = temp.path().join("src").join("pages");
        std::fs::create_dir_all(&nested).unwrap();

        let found = ConfigManager::find_project_config(&nested).unwrap();
        assert_eq!(found, temp.path().join(CONFIG_FILE));
    }

    #[test]
    fn project_dir_is_config_parent() {
        let manager = ConfigManager::with_path(PathBuf::from("/srv/app/pwakit.toml"));
        assert_eq!(manager.project_dir(), PathBuf::from("/srv/app"));

        let bare = ConfigManager::with_path(PathBuf::from("pwakit.toml"));
        assert_eq!(bare.project_dir(), PathBuf::from("."));
    }
}
