//! Configuration schema for pwakit
//!
//! Configuration is stored in a project-local `pwakit.toml`.

use crate::build::routes::RouteRule;
use crate::precache::PrecacheEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Application layout (directories, base path)
    pub app: AppConfig,

    /// Generated worker settings
    pub worker: WorkerConfig,

    /// Precache manifest settings
    pub precache: PrecacheConfig,

    /// Start URL caching
    pub start_url: StartUrlConfig,

    /// Page-side navigation caching
    pub navigation: NavigationConfig,

    /// Offline fallbacks per destination
    pub fallbacks: FallbackConfig,

    /// External bundler for auxiliary worker scripts
    pub bundler: BundlerConfig,

    /// Runtime caching rules (empty = built-in defaults)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runtime_caching: Vec<RouteRule>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Application layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application root, relative to the config file
    pub dir: PathBuf,

    /// Build output directory, relative to `dir`
    pub dist_dir: PathBuf,

    /// Static asset directory, relative to `dir`
    pub public_dir: PathBuf,

    /// URL base path the app is served under
    pub base_path: String,

    /// Fixed build identifier (random per build when unset)
    pub build_id: Option<String>,

    /// Page file extensions used to detect the offline page
    pub page_extensions: Vec<String>,

    /// Build emits `.module.js` bundles; legacy `.js` bundles are not precached
    pub modern: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            dist_dir: PathBuf::from(".next"),
            public_dir: PathBuf::from("public"),
            base_path: "/".to_string(),
            build_id: None,
            page_extensions: ["tsx", "ts", "jsx", "js", "mdx"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            modern: false,
        }
    }
}

/// Generated worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Disable the whole offline layer
    pub disable: bool,

    /// Register the worker automatically from the page
    pub register: bool,

    /// Output directory for the worker (defaults to `app.dist_dir`)
    pub dest: Option<PathBuf>,

    /// Worker script file name
    pub sw: String,

    /// Registration scope (defaults to the base path)
    pub scope: Option<String>,

    /// Custom worker source to inject the manifest into
    pub sw_src: Option<PathBuf>,

    /// Directory holding a custom worker entry (`index.ts` or `index.js`)
    pub custom_worker_dir: PathBuf,

    pub skip_waiting: bool,

    pub clients_claim: bool,

    pub cleanup_outdated_caches: bool,

    /// Extra scripts imported by the worker
    pub import_scripts: Vec<String>,

    /// Deprecated, use `app.base_path`
    pub subdomain_prefix: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            disable: false,
            register: true,
            dest: None,
            sw: "sw.js".to_string(),
            scope: None,
            sw_src: None,
            custom_worker_dir: PathBuf::from("worker"),
            skip_waiting: true,
            clients_claim: true,
            cleanup_outdated_caches: true,
            import_scripts: vec![],
            subdomain_prefix: None,
        }
    }
}

/// Precache manifest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecacheConfig {
    /// Reuse revisions from the manifest cache store between builds
    pub enable_incremental_manifest: bool,

    /// Manifest cache store path (defaults to `<dir>/.next/manifest-cache.json`)
    pub manifest_cache_file: Option<PathBuf>,

    /// Glob patterns excluded from the public directory scan
    pub public_excludes: Vec<String>,

    /// Glob patterns excluded from compiled build assets
    pub build_excludes: Vec<String>,

    /// Explicit manifest entries; when set, scanning is skipped entirely
    pub additional_manifest_entries: Option<Vec<PrecacheEntry>>,

    /// URL prefix rewrites applied by the caching engine
    pub modify_url_prefix: BTreeMap<String, String>,

    /// Query parameter patterns ignored when matching precached URLs
    pub ignore_url_parameters_matching: Vec<String>,

    /// Skip the built-in manifest transform
    pub disable_default_manifest_transform: bool,
}

impl Default for PrecacheConfig {
    fn default() -> Self {
        Self {
            enable_incremental_manifest: true,
            manifest_cache_file: None,
            public_excludes: vec!["!noprecache/**/*".to_string()],
            build_excludes: vec![],
            additional_manifest_entries: None,
            modify_url_prefix: BTreeMap::new(),
            ignore_url_parameters_matching: vec![],
            disable_default_manifest_transform: false,
        }
    }
}

/// Start URL caching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartUrlConfig {
    /// Cache the start URL at all
    pub cache_start_url: bool,

    /// Start URL content is dynamic (network-first, refreshed at runtime)
    pub dynamic_start_url: bool,

    /// Where a dynamic start URL redirects to, precached with the build id
    pub dynamic_start_url_redirect: Option<String>,
}

impl Default for StartUrlConfig {
    fn default() -> Self {
        Self {
            cache_start_url: true,
            dynamic_start_url: true,
            dynamic_start_url_redirect: None,
        }
    }
}

/// Page-side navigation caching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Cache pages visited through client-side navigation
    pub cache_on_front_end_nav: bool,

    /// Reload the page when the browser comes back online
    pub reload_on_online: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            cache_on_front_end_nav: false,
            reload_on_online: true,
        }
    }
}

/// Offline fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub document: Option<String>,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub font: Option<String>,
    /// Data fallback; a `.json` value is resolved under `/_next/data/<build id>/`
    pub data: Option<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            document: None,
            image: None,
            audio: None,
            video: None,
            font: None,
            data: None,
        }
    }
}

/// External bundler command
///
/// `command` is split into program and arguments; `{entry}`, `{outdir}`,
/// `{outfile}` and `{filename}` are substituted per bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    pub command: Vec<String>,

    /// Appended when minifying (production builds)
    pub minify_flag: Option<String>,

    /// Appended once per disabled builtin module, `{module}` substituted
    pub external_flag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[app]"));
        assert!(toml.contains("[precache]"));
        assert!(!toml.contains("runtime_caching"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.worker.sw, "sw.js");
        assert_eq!(config.app.base_path, "/");
        assert!(config.precache.enable_incremental_manifest);
        assert!(config.start_url.dynamic_start_url);
        assert!(!config.navigation.cache_on_front_end_nav);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [app]
            base_path = "/shop"

            [fallbacks]
            image = "/static/offline.png"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.app.base_path, "/shop");
        assert_eq!(config.fallbacks.image.as_deref(), Some("/static/offline.png"));
        assert_eq!(config.app.dist_dir, PathBuf::from(".next")); // default preserved
    }

    #[test]
    fn additional_entries_parse() {
        let toml = r#"
            [precache]
            additional_manifest_entries = [
                { url = "/offline.html", revision = "1" },
                { url = "/_next/static/app.abc123.js" },
            ]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let entries = config.precache.additional_manifest_entries.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].revision.as_deref(), Some("1"));
        assert!(entries[1].revision.is_none());
    }
}
