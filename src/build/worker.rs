//! Custom worker bundling
//!
//! A project may ship its own worker code in `worker/index.{ts,js}` (or under
//! `src/`). It is handed to an external bundler and the result is imported
//! by the generated worker.

use crate::config::schema::BundlerConfig;
use crate::error::{PwaError, PwaResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Node builtins that make no sense in a worker bundle
pub const DISABLED_BUILTINS: [&str; 13] = [
    "module",
    "dgram",
    "dns",
    "path",
    "fs",
    "os",
    "crypto",
    "stream",
    "http2",
    "net",
    "tls",
    "zlib",
    "child_process",
];

/// Max number of bundler output lines kept in error messages
const ERROR_TAIL_LINES: usize = 50;

/// Runtime the bundle targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleTarget {
    WebWorker,
}

impl BundleTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebWorker => "webworker",
        }
    }
}

/// One bundling job
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub entry: PathBuf,
    pub dest_dir: PathBuf,
    pub filename: String,
    pub target: BundleTarget,
    /// Modules resolved to nothing
    pub disabled_builtins: Vec<String>,
    pub minify: bool,
}

impl BundleRequest {
    pub fn worker(entry: PathBuf, dest_dir: PathBuf, filename: String, minify: bool) -> Self {
        Self {
            entry,
            dest_dir,
            filename,
            target: BundleTarget::WebWorker,
            disabled_builtins: DISABLED_BUILTINS.iter().map(|s| s.to_string()).collect(),
            minify,
        }
    }

    pub fn outfile(&self) -> PathBuf {
        self.dest_dir.join(&self.filename)
    }
}

/// External bundler
#[async_trait]
pub trait WorkerBundler: Send + Sync {
    /// Bundle the entry and return the written file name
    async fn bundle(&self, request: &BundleRequest) -> PwaResult<String>;
}

/// Runs a configured bundler command line
pub struct CommandBundler {
    config: BundlerConfig,
}

impl CommandBundler {
    pub fn new(config: BundlerConfig) -> Self {
        Self { config }
    }

    /// Full command line for a request, placeholders substituted
    pub fn command_line(&self, request: &BundleRequest) -> PwaResult<Vec<String>> {
        if self.config.command.is_empty() {
            return Err(PwaError::BundlerNotConfigured(
                request.entry.display().to_string(),
            ));
        }

        let entry = request.entry.display().to_string();
        let outdir = request.dest_dir.display().to_string();
        let outfile = request.outfile().display().to_string();
        let substitute = |arg: &str| {
            arg.replace("{entry}", &entry)
                .replace("{outdir}", &outdir)
                .replace("{outfile}", &outfile)
                .replace("{filename}", &request.filename)
        };

        let mut args: Vec<String> = self.config.command.iter().map(|a| substitute(a)).collect();
        if let Some(flag) = &self.config.external_flag {
            args.extend(
                request
                    .disabled_builtins
                    .iter()
                    .map(|module| flag.replace("{module}", module)),
            );
        }
        if request.minify {
            if let Some(flag) = &self.config.minify_flag {
                args.push(flag.clone());
            }
        }
        Ok(args)
    }
}

#[async_trait]
impl WorkerBundler for CommandBundler {
    async fn bundle(&self, request: &BundleRequest) -> PwaResult<String> {
        let args = self.command_line(request)?;
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| PwaError::BundlerNotConfigured(request.entry.display().to_string()))?;

        debug!("Executing bundler: {:?}", args);
        let output = Command::new(program)
            .args(rest)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| PwaError::BundlerFailed {
                entry: request.entry.clone(),
                stderr: format!("failed to run {}: {}", program, e),
            })?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PwaError::BundlerFailed {
                entry: request.entry.clone(),
                stderr: error_tail(&stdout, &stderr),
            });
        }

        Ok(request.filename.clone())
    }
}

/// Last lines of combined bundler output
fn error_tail(stdout: &str, stderr: &str) -> String {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Locate the custom worker entry, if the project has one
pub fn discover_custom_worker(app_dir: &Path, custom_worker_dir: &Path) -> PwaResult<Option<PathBuf>> {
    let Some(worker_dir) = [
        app_dir.join(custom_worker_dir),
        app_dir.join("src").join(custom_worker_dir),
    ]
    .into_iter()
    .find(|dir| dir.exists()) else {
        return Ok(None);
    };

    let mut entries: Vec<PathBuf> = ["ts", "js"]
        .iter()
        .map(|ext| worker_dir.join(format!("index.{}", ext)))
        .filter(|path| path.exists())
        .collect();

    match entries.len() {
        0 => Ok(None),
        1 => Ok(entries.pop()),
        _ => Err(PwaError::AmbiguousSource {
            kind: "custom worker",
            candidates: entries,
        }),
    }
}

/// Bundle the custom worker as `worker-<build id>.js`; `None` when there is none
pub async fn build_custom_worker(
    bundler: &dyn WorkerBundler,
    app_dir: &Path,
    custom_worker_dir: &Path,
    dest_dir: &Path,
    build_id: &str,
    minify: bool,
) -> PwaResult<Option<String>> {
    let Some(entry) = discover_custom_worker(app_dir, custom_worker_dir)? else {
        return Ok(None);
    };

    let request = BundleRequest::worker(
        entry,
        dest_dir.to_path_buf(),
        format!("worker-{}.js", build_id),
        minify,
    );
    info!("Custom worker found: {}", request.entry.display());
    info!("Build custom worker: {}", request.outfile().display());

    bundler.bundle(&request).await.map(Some)
}
