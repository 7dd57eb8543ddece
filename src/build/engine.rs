//! Hand-off to the caching engine
//!
//! The engine that generates the worker is external. It receives one
//! [`WorkerSpec`] per build: the resolved manifest, the exclusion rules and
//! the routing table.

use crate::build::routes::{ExcludeRule, RouteRule};
use crate::error::{PwaError, PwaResult};
use crate::precache::PrecacheEntry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

/// File the worker spec engine writes next to the worker
pub const WORKER_SPEC_FILE: &str = "pwa-worker.json";

/// How the engine produces the worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WorkerMode {
    /// Generate the whole worker from the routing table
    Generate,
    /// Inject the manifest into a project-provided worker source
    InjectManifest { sw_src: PathBuf },
}

/// Everything the engine needs for one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub sw_dest: PathBuf,
    #[serde(flatten)]
    pub mode: WorkerMode,
    pub manifest: Vec<PrecacheEntry>,
    pub exclude: Vec<ExcludeRule>,
    pub modify_url_prefix: BTreeMap<String, String>,
    pub skip_waiting: bool,
    pub clients_claim: bool,
    pub cleanup_outdated_caches: bool,
    pub ignore_url_parameters_matching: Vec<String>,
    pub import_scripts: Vec<String>,
    pub runtime_caching: Vec<RouteRule>,
}

impl WorkerSpec {
    /// Every manifest entry has a resolved revision and every rule is valid
    pub fn validate(&self) -> PwaResult<()> {
        if let Some(entry) = self.manifest.iter().find(|e| e.revision.is_none()) {
            return Err(PwaError::Internal(format!(
                "manifest entry {} has no revision",
                entry.url
            )));
        }
        for rule in &self.runtime_caching {
            rule.validate()?;
        }
        Ok(())
    }
}

/// External worker generator
#[async_trait]
pub trait CachingEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn emit(&self, spec: &WorkerSpec) -> PwaResult<()>;
}

/// Writes the worker spec as JSON for an engine that runs as a separate build step
pub struct SpecFileEngine {
    dest_dir: PathBuf,
}

impl SpecFileEngine {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    pub fn spec_path(&self) -> PathBuf {
        self.dest_dir.join(WORKER_SPEC_FILE)
    }
}

#[async_trait]
impl CachingEngine for SpecFileEngine {
    fn name(&self) -> &'static str {
        "spec-file"
    }

    async fn emit(&self, spec: &WorkerSpec) -> PwaResult<()> {
        spec.validate()?;

        let path = self.spec_path();
        let json = serde_json::to_string_pretty(spec)?;
        tokio::fs::create_dir_all(&self.dest_dir)
            .await
            .map_err(|e| PwaError::io(format!("creating {}", self.dest_dir.display()), e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| PwaError::io(format!("writing {}", path.display()), e))?;

        info!("Worker spec written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::routes::{dev_runtime_caching, UrlMatcher};
    use tempfile::TempDir;

    fn spec() -> WorkerSpec {
        WorkerSpec {
            sw_dest: PathBuf::from(".next/sw.js"),
            mode: WorkerMode::Generate,
            manifest: vec![PrecacheEntry::new("/a.png", "abc")],
            exclude: vec![],
            modify_url_prefix: BTreeMap::new(),
            skip_waiting: true,
            clients_claim: true,
            cleanup_outdated_caches: true,
            ignore_url_parameters_matching: vec![],
            import_scripts: vec![],
            runtime_caching: dev_runtime_caching(),
        }
    }

    #[test]
    fn unresolved_revision_rejected() {
        let mut spec = spec();
        spec.manifest.push(PrecacheEntry::unversioned("/x.js"));
        assert!(matches!(spec.validate(), Err(PwaError::Internal(_))));
    }

    #[test]
    fn invalid_rule_rejected() {
        let mut spec = spec();
        spec.runtime_caching[0].url_pattern = UrlMatcher::regex("[");
        assert!(spec.validate().is_err());
    }

    #[test]
    fn mode_flattened_into_spec() {
        let mut spec = spec();
        spec.mode = WorkerMode::InjectManifest {
            sw_src: PathBuf::from("worker/sw.js"),
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["mode"], "inject_manifest");
        assert_eq!(json["sw_src"], "worker/sw.js");

        let back: WorkerSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, spec);
    }

    #[tokio::test]
    async fn spec_file_written() {
        let dir = TempDir::new().unwrap();
        let engine = SpecFileEngine::new(dir.path().join(".next"));

        engine.emit(&spec()).await.unwrap();

        let raw = std::fs::read_to_string(engine.spec_path()).unwrap();
        let written: WorkerSpec = serde_json::from_str(&raw).unwrap();
        assert_eq!(written.manifest[0].url, "/a.png");
        assert_eq!(written.mode, WorkerMode::Generate);
    }
}
