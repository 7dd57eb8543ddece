//! Flags resolved at build time and read by the page and worker
//!
//! Serialized next to the generated worker as `pwa-runtime.json`.

use crate::config::Config;
use crate::error::{PwaError, PwaResult};
use crate::precache::join_url;
use crate::runtime::fallback::FallbackTable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the serialized runtime config
pub const RUNTIME_CONFIG_FILE: &str = "pwa-runtime.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Worker script URL
    pub sw: String,

    /// Registration scope, always slash-terminated
    pub scope: String,

    pub enable_register: bool,

    /// Set only when the start URL is dynamic
    pub start_url: Option<String>,

    pub cache_on_front_end_nav: bool,

    pub reload_on_online: bool,

    /// Absent when no fallback is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<FallbackTable>,
}

impl RuntimeConfig {
    /// Resolve runtime flags from project configuration
    pub fn from_config(config: &Config, fallbacks: Option<FallbackTable>) -> Self {
        let base_path = config.app.base_path.as_str();
        let sw = config.worker.sw.as_str();
        let sw = if sw.starts_with('/') {
            sw.to_string()
        } else {
            format!("/{}", sw)
        };
        let scope = config.worker.scope.as_deref().unwrap_or(base_path);

        Self {
            sw: join_url(base_path, &sw),
            scope: join_url(scope, "/"),
            enable_register: config.worker.register,
            start_url: config
                .start_url
                .dynamic_start_url
                .then(|| base_path.to_string()),
            cache_on_front_end_nav: config.navigation.cache_on_front_end_nav,
            reload_on_online: config.navigation.reload_on_online,
            fallbacks: fallbacks.filter(|t| !t.is_empty()),
        }
    }

    pub fn load(path: &Path) -> PwaResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PwaError::io(format!("reading {}", path.display()), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> PwaResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| PwaError::io(format!("writing {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_resolve() {
        let rc = RuntimeConfig::from_config(&Config::default(), None);
        assert_eq!(rc.sw, "/sw.js");
        assert_eq!(rc.scope, "/");
        assert!(rc.enable_register);
        assert_eq!(rc.start_url.as_deref(), Some("/"));
        assert!(!rc.cache_on_front_end_nav);
        assert!(rc.reload_on_online);
        assert!(rc.fallbacks.is_none());
    }

    #[test]
    fn base_path_applies_to_sw_and_scope() {
        let mut config = Config::default();
        config.app.base_path = "/docs".to_string();
        config.worker.sw = "/service-worker.js".to_string();

        let rc = RuntimeConfig::from_config(&config, None);
        assert_eq!(rc.sw, "/docs/service-worker.js");
        assert_eq!(rc.scope, "/docs/");
        assert_eq!(rc.start_url.as_deref(), Some("/docs"));
    }

    #[test]
    fn static_start_url_not_exposed() {
        let mut config = Config::default();
        config.start_url.dynamic_start_url = false;
        config.worker.scope = Some("/app".to_string());

        let rc = RuntimeConfig::from_config(&config, None);
        assert!(rc.start_url.is_none());
        assert_eq!(rc.scope, "/app/");
    }

    #[test]
    fn empty_fallback_table_dropped() {
        let rc = RuntimeConfig::from_config(&Config::default(), Some(FallbackTable::default()));
        assert!(rc.fallbacks.is_none());
    }

    #[test]
    fn save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(RUNTIME_CONFIG_FILE);
        let rc = RuntimeConfig::from_config(
            &Config::default(),
            Some(FallbackTable {
                document: Some("/_offline".to_string()),
                ..FallbackTable::default()
            }),
        );

        rc.save(&path).unwrap();
        assert_eq!(RuntimeConfig::load(&path).unwrap(), rc);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""image": false"#));
    }
}
