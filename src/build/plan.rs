//! Build plan
//!
//! One `pwakit build` run: clean stale outputs, bundle the custom worker,
//! generate the precache manifest, resolve fallbacks and the routing table,
//! then hand everything to the caching engine and write the runtime config.

use crate::build::engine::{CachingEngine, SpecFileEngine, WorkerMode, WorkerSpec};
use crate::build::fallback::resolve_fallbacks;
use crate::build::routes::{
    attach_fallback_plugin, default_runtime_caching, dev_runtime_caching, exclude_rules,
    start_url_rule, AssetFilter,
};
use crate::build::worker::{build_custom_worker, CommandBundler, WorkerBundler};
use crate::config::Config;
use crate::error::{PwaError, PwaResult};
use crate::precache::{
    apply_transforms, resolve_revisions, ChangeSummary, DefaultTransform, GeneratorOptions,
    ManifestCacheStore, ManifestGenerator, ManifestTransform, PrecacheEntry, ProgressFn,
};
use crate::runtime::{FallbackTable, RuntimeConfig, RUNTIME_CONFIG_FILE};
use globset::{Glob, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Development build: no precaching, network-only routing
    pub dev: bool,
    /// Overrides `app.build_id`
    pub build_id: Option<String>,
}

/// What a build produced
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build_id: String,
    pub dest_dir: PathBuf,
    pub sw_path: PathBuf,
    pub manifest: Vec<PrecacheEntry>,
    /// `None` in full-scan mode
    pub summary: Option<ChangeSummary>,
    pub custom_worker: Option<String>,
    pub removed: Vec<PathBuf>,
    pub runtime_config: RuntimeConfig,
}

pub struct BuildPlan {
    config: Config,
    project_dir: PathBuf,
    bundler: Box<dyn WorkerBundler>,
    engine: Box<dyn CachingEngine>,
    transforms: Vec<Box<dyn ManifestTransform>>,
    progress: Option<ProgressFn>,
}

impl BuildPlan {
    /// Plan with the configured bundler command and the worker spec file engine
    pub fn new(config: Config, project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        let engine = SpecFileEngine::new(dest_dir_for(&config, &project_dir));
        Self {
            bundler: Box::new(CommandBundler::new(config.bundler.clone())),
            engine: Box::new(engine),
            config,
            project_dir,
            transforms: Vec::new(),
            progress: None,
        }
    }

    pub fn with_bundler(mut self, bundler: Box<dyn WorkerBundler>) -> Self {
        self.bundler = bundler;
        self
    }

    pub fn with_engine(mut self, engine: Box<dyn CachingEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// Extra manifest transform, run before the built-in one
    pub fn with_transform(mut self, transform: Box<dyn ManifestTransform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn app_dir(&self) -> PathBuf {
        self.project_dir.join(&self.config.app.dir)
    }

    /// Where the worker and its side files are written
    pub fn dest_dir(&self) -> PathBuf {
        dest_dir_for(&self.config, &self.project_dir)
    }

    pub fn store_path(&self) -> PathBuf {
        match &self.config.precache.manifest_cache_file {
            Some(path) => self.app_dir().join(path),
            None => self.app_dir().join(".next").join("manifest-cache.json"),
        }
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            public_dir: self.app_dir().join(&self.config.app.public_dir),
            base_path: self.config.app.base_path.clone(),
            sw: self.config.worker.sw.clone(),
            public_excludes: self.config.precache.public_excludes.clone(),
            additional_manifest_entries: self.config.precache.additional_manifest_entries.clone(),
        }
    }

    /// Build id for this run: explicit option, then config, then random
    pub fn resolve_build_id(&self, options: &BuildOptions) -> String {
        options
            .build_id
            .clone()
            .or_else(|| self.config.app.build_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string())
    }

    /// Run the build; `None` when the offline layer is disabled
    pub async fn run(&mut self, options: &BuildOptions) -> PwaResult<Option<BuildOutcome>> {
        let config = &self.config;
        if config.worker.disable {
            info!("PWA support is disabled");
            return Ok(None);
        }
        if config.worker.subdomain_prefix.is_some() {
            error!("worker.subdomain_prefix is deprecated, use app.base_path instead");
        }

        let build_id = self.resolve_build_id(options);
        let app_dir = self.app_dir();
        let dest_dir = self.dest_dir();
        let sw_file = config.worker.sw.trim_start_matches('/').to_string();
        let sw_path = dest_dir.join(&sw_file);
        info!("Build {} ({})", build_id, if options.dev { "dev" } else { "production" });

        std::fs::create_dir_all(&dest_dir)
            .map_err(|e| PwaError::io(format!("creating {}", dest_dir.display()), e))?;
        let removed = clean_stale_outputs(&dest_dir, &sw_file)?;

        // Custom worker
        let mut import_scripts = config.worker.import_scripts.clone();
        let custom_worker = match build_custom_worker(
            self.bundler.as_ref(),
            &app_dir,
            &config.worker.custom_worker_dir,
            &dest_dir,
            &build_id,
            !options.dev,
        )
        .await
        {
            Ok(name) => name,
            Err(e) if e.is_recoverable() => {
                error!("Error building custom worker: {}", e);
                None
            }
            Err(e) => return Err(e),
        };
        if let Some(name) = &custom_worker {
            import_scripts.insert(0, name.clone());
        }

        // Precache manifest
        let mut generator = ManifestGenerator::new(self.generator_options())?;
        if let Some(progress) = self.progress.take() {
            generator = generator.with_progress(progress);
        }
        let (mut manifest, summary) = if config.precache.enable_incremental_manifest {
            let store = ManifestCacheStore::new(self.store_path());
            let report = generator.generate_incremental(&store)?;
            (report.entries, Some(report.summary))
        } else {
            (generator.generate()?, None)
        };

        push_start_url_entries(config, &build_id, &mut manifest);

        let fallbacks = resolve_fallbacks(
            &config.fallbacks,
            &app_dir,
            &build_id,
            &config.app.page_extensions,
        )?;
        if let Some(table) = &fallbacks {
            push_fallback_entries(table, &build_id, &mut manifest);
        }

        let manifest = apply_transforms(manifest, &self.transforms);
        let manifest = if config.precache.disable_default_manifest_transform {
            resolve_revisions(manifest, &build_id)
        } else {
            DefaultTransform::new(build_id.clone()).transform(manifest)
        };

        let spec = self.worker_spec(options, &sw_path, &manifest, import_scripts, fallbacks.is_some())?;
        debug!("Handing worker spec to the {} engine", self.engine.name());
        self.engine.emit(&spec).await?;

        let runtime_config = RuntimeConfig::from_config(&self.config, fallbacks);
        info!("  url: {}", runtime_config.sw);
        info!("  scope: {}", runtime_config.scope);
        if runtime_config.enable_register {
            info!("Auto register service worker enabled");
        } else {
            info!("Auto register service worker is disabled, register it from the page");
        }
        runtime_config.save(&dest_dir.join(RUNTIME_CONFIG_FILE))?;

        Ok(Some(BuildOutcome {
            build_id,
            dest_dir,
            sw_path,
            manifest,
            summary,
            custom_worker,
            removed,
            runtime_config,
        }))
    }

    fn worker_spec(
        &self,
        options: &BuildOptions,
        sw_path: &Path,
        manifest: &[PrecacheEntry],
        import_scripts: Vec<String>,
        has_fallbacks: bool,
    ) -> PwaResult<WorkerSpec> {
        let config = &self.config;

        let exclude = exclude_rules(&config.precache.build_excludes, options.dev, config.app.modern);
        // Compile once so bad globs fail the build here rather than in the engine
        AssetFilter::new(exclude.clone())?;

        let mut modify_url_prefix = config.precache.modify_url_prefix.clone();
        modify_url_prefix.insert("/_next/../public/".to_string(), "/".to_string());

        let mut ignore_url_parameters_matching = config.precache.ignore_url_parameters_matching.clone();

        let (mode, runtime_caching) = match &config.worker.sw_src {
            Some(sw_src) => {
                let sw_src = self.app_dir().join(sw_src);
                info!("Inject manifest in {}", sw_src.display());
                (WorkerMode::InjectManifest { sw_src }, Vec::new())
            }
            None => {
                let mut rules = if options.dev {
                    info!("Develop mode: caching is disabled, using NetworkOnly");
                    ignore_url_parameters_matching.push("ts".to_string());
                    dev_runtime_caching()
                } else if config.runtime_caching.is_empty() {
                    default_runtime_caching()
                } else {
                    config.runtime_caching.clone()
                };
                if config.start_url.dynamic_start_url {
                    rules.insert(0, start_url_rule(&config.app.base_path));
                }
                if has_fallbacks {
                    attach_fallback_plugin(&mut rules);
                }
                (WorkerMode::Generate, rules)
            }
        };

        debug!("Routing table has {} rules", runtime_caching.len());

        Ok(WorkerSpec {
            sw_dest: sw_path.to_path_buf(),
            mode,
            manifest: if options.dev { Vec::new() } else { manifest.to_vec() },
            exclude,
            modify_url_prefix,
            skip_waiting: config.worker.skip_waiting,
            clients_claim: config.worker.clients_claim,
            cleanup_outdated_caches: config.worker.cleanup_outdated_caches,
            ignore_url_parameters_matching,
            import_scripts,
            runtime_caching,
        })
    }
}

fn dest_dir_for(config: &Config, project_dir: &Path) -> PathBuf {
    let dest = config.worker.dest.as_ref().unwrap_or(&config.app.dist_dir);
    project_dir.join(&config.app.dir).join(dest)
}

/// Precache the start URL when it is static, or its redirect target when dynamic
fn push_start_url_entries(config: &Config, build_id: &str, manifest: &mut Vec<PrecacheEntry>) {
    let start = &config.start_url;
    if !start.cache_start_url {
        return;
    }
    if !start.dynamic_start_url {
        manifest.push(PrecacheEntry::new(config.app.base_path.clone(), build_id));
    } else if let Some(redirect) = start.dynamic_start_url_redirect.as_ref().filter(|r| !r.is_empty()) {
        manifest.push(PrecacheEntry::new(redirect.clone(), build_id));
    }
}

/// Precache every fallback route not already covered by an entry
fn push_fallback_entries(table: &FallbackTable, build_id: &str, manifest: &mut Vec<PrecacheEntry>) {
    for (_, route) in table.routes() {
        if !manifest.iter().any(|e| e.url.starts_with(route)) {
            manifest.push(PrecacheEntry::new(route, build_id));
        }
    }
}

/// Delete worker outputs left over from previous builds
pub fn clean_stale_outputs(dest_dir: &Path, sw: &str) -> PwaResult<Vec<PathBuf>> {
    let patterns = [
        "workbox-*.js".to_string(),
        "workbox-*.js.map".to_string(),
        "worker-*.js.LICENSE.txt".to_string(),
        sw.to_string(),
        format!("{}.map", sw),
    ];
    let mut builder = GlobSetBuilder::new();
    for pattern in &patterns {
        builder.add(Glob::new(pattern).map_err(|e| PwaError::ExcludePattern {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?);
    }
    let set = builder.build().map_err(|e| PwaError::ExcludePattern {
        pattern: patterns.join(", "),
        reason: e.to_string(),
    })?;

    let entries = match std::fs::read_dir(dest_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(PwaError::io(format!("reading {}", dest_dir.display()), e)),
    };

    let mut removed = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        if set.is_match(Path::new(&name)) {
            std::fs::remove_file(&path)
                .map_err(|e| PwaError::io(format!("removing {}", path.display()), e))?;
            debug!("Removed stale output {}", path.display());
            removed.push(path);
        }
    }
    removed.sort();
    Ok(removed)
}
