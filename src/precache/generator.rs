//! Incremental manifest generator
//!
//! Walks the public asset directory, hashes every file that survives the
//! exclusion set and turns the result into precache entries. Revisions are
//! resolved against the previous build's [`StoreSnapshot`] and the fresh
//! snapshot is persisted at the end of every run.

use crate::build::engine::WORKER_SPEC_FILE;
use crate::error::{PwaError, PwaResult};
use crate::precache::entry::{join_url, PrecacheEntry};
use crate::precache::hasher::ContentHasher;
use crate::precache::store::{AssetRecord, ManifestCacheStore, StoreSnapshot};
use crate::runtime::RUNTIME_CONFIG_FILE;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Generated artifacts that never belong in the manifest
pub const DEFAULT_EXCLUDES: [&str; 6] = [
    "workbox-*.js",
    "workbox-*.js.map",
    "worker-*.js",
    "worker-*.js.map",
    "fallback-*.js",
    "fallback-*.js.map",
];

/// Inputs for one generator run
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Asset root (usually `<app>/public`)
    pub public_dir: PathBuf,

    /// URL base path entries are joined onto
    pub base_path: String,

    /// Worker file name; it, its source map and the build side files are excluded
    pub sw: String,

    /// User exclusion patterns, a leading `!` is accepted and ignored
    pub public_excludes: Vec<String>,

    /// When set, returned verbatim and no scan happens
    pub additional_manifest_entries: Option<Vec<PrecacheEntry>>,
}

impl GeneratorOptions {
    pub fn new(public_dir: impl Into<PathBuf>, base_path: impl Into<String>) -> Self {
        Self {
            public_dir: public_dir.into(),
            base_path: base_path.into(),
            sw: "sw.js".to_string(),
            public_excludes: vec![],
            additional_manifest_entries: None,
        }
    }
}

/// Compiled exclusion patterns, matched against POSIX relative paths
#[derive(Debug)]
pub struct ExcludeSet {
    set: GlobSet,
}

impl ExcludeSet {
    /// Default generated-artifact patterns, the worker and its side files, then user patterns
    pub fn build(sw: &str, patterns: &[String]) -> PwaResult<Self> {
        let sw = sw.trim_start_matches('/');
        let mut all: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
        all.push(sw.to_string());
        all.push(format!("{}.map", sw));
        all.push(WORKER_SPEC_FILE.to_string());
        all.push(RUNTIME_CONFIG_FILE.to_string());
        all.extend(
            patterns
                .iter()
                .map(|p| p.strip_prefix('!').unwrap_or(p).to_string()),
        );

        let mut builder = GlobSetBuilder::new();
        for pattern in &all {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| PwaError::ExcludePattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
        }

        let set = builder.build().map_err(|e| PwaError::ExcludePattern {
            pattern: all.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self { set })
    }

    pub fn is_excluded(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }
}

/// Decides the revision emitted for a scanned asset
pub trait RevisionPolicy: Send + Sync {
    fn revision(&self, fresh: &str, prior: Option<&AssetRecord>) -> String;
}

/// Reuse the stored content id while it still matches, otherwise take the fresh one
pub struct StoredRevision;

impl RevisionPolicy for StoredRevision {
    fn revision(&self, fresh: &str, prior: Option<&AssetRecord>) -> String {
        match prior {
            Some(record) if record.hash == fresh => record.hash.clone(),
            _ => fresh.to_string(),
        }
    }
}

/// What changed relative to the previous build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub removed: usize,
}

impl ChangeSummary {
    pub fn has_changes(&self) -> bool {
        self.added + self.changed + self.removed > 0
    }
}

/// Output of one generator run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub entries: Vec<PrecacheEntry>,
    pub summary: ChangeSummary,
}

/// Progress callback, `(done, total)`
pub type ProgressFn = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Produces precache entries for the public directory
pub struct ManifestGenerator {
    options: GeneratorOptions,
    excludes: ExcludeSet,
    policy: Box<dyn RevisionPolicy>,
    progress: Option<ProgressFn>,
}

impl ManifestGenerator {
    pub fn new(options: GeneratorOptions) -> PwaResult<Self> {
        let excludes = ExcludeSet::build(&options.sw, &options.public_excludes)?;
        Ok(Self {
            options,
            excludes,
            policy: Box::new(StoredRevision),
            progress: None,
        })
    }

    pub fn with_policy(mut self, policy: Box<dyn RevisionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Called with `(done, total)` after each hashed file
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Sorted POSIX paths of every asset under the public directory that survives exclusion
    pub fn scan(&self) -> PwaResult<Vec<String>> {
        let root = &self.options.public_dir;
        if !root.is_dir() {
            debug!("Public directory {} not found, nothing to precache", root.display());
            return Ok(vec![]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                PwaError::AssetRead {
                    path,
                    source: e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop")),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(relative) = relative_posix(root, entry.path()) else {
                return Err(PwaError::AssetRead {
                    path: entry.path().to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "path is not valid UTF-8",
                    ),
                });
            };
            if self.excludes.is_excluded(&relative) {
                debug!("Excluded from precache: {}", relative);
                continue;
            }
            files.push(relative);
        }

        files.sort();
        Ok(files)
    }

    /// Scan and hash without touching any store
    pub fn generate(&self) -> PwaResult<Vec<PrecacheEntry>> {
        if let Some(entries) = &self.options.additional_manifest_entries {
            return Ok(entries.clone());
        }

        let files = self.scan()?;
        let total = files.len();
        let mut entries = Vec::with_capacity(total);
        for (i, relative) in files.iter().enumerate() {
            let hash = ContentHasher::hash_file(&self.options.public_dir.join(relative))?;
            entries.push(self.entry_for(relative, hash));
            self.report_progress(i + 1, total);
        }
        Ok(entries)
    }

    /// Scan, hash, resolve revisions against the store and persist the new snapshot
    ///
    /// A failure to persist is logged and does not fail the run.
    pub fn generate_incremental(&self, store: &ManifestCacheStore) -> PwaResult<GenerationReport> {
        if let Some(entries) = &self.options.additional_manifest_entries {
            debug!("Using {} configured manifest entries", entries.len());
            return Ok(GenerationReport {
                entries: entries.clone(),
                summary: ChangeSummary::default(),
            });
        }

        let prior = store.load();
        let files = self.scan()?;
        let total = files.len();

        let mut snapshot = StoreSnapshot::new();
        let mut summary = ChangeSummary::default();
        let mut entries = Vec::with_capacity(total);

        for (i, relative) in files.iter().enumerate() {
            let fresh = ContentHasher::hash_file(&self.options.public_dir.join(relative))?;
            let previous = prior.get(relative);
            match previous {
                None => summary.added += 1,
                Some(record) if record.hash == fresh => summary.unchanged += 1,
                Some(_) => summary.changed += 1,
            }

            let revision = self.policy.revision(&fresh, previous);
            snapshot.insert(relative.clone(), fresh);
            entries.push(self.entry_for(relative, revision));
            self.report_progress(i + 1, total);
        }

        summary.removed = prior
            .iter()
            .filter(|(path, _)| !snapshot.contains(path))
            .count();

        if let Err(e) = store.save(&snapshot) {
            error!("{}", e);
        }

        info!(
            "Precache manifest: {} entries ({} new, {} changed, {} removed)",
            entries.len(),
            summary.added,
            summary.changed,
            summary.removed
        );

        Ok(GenerationReport { entries, summary })
    }

    fn entry_for(&self, relative: &str, revision: String) -> PrecacheEntry {
        PrecacheEntry::new(
            join_url(&self.options.base_path, &format!("/{}", relative)),
            revision,
        )
    }

    fn report_progress(&self, done: usize, total: usize) {
        if let Some(progress) = &self.progress {
            progress(done, total);
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}
