//! Error types for pwakit
//!
//! All modules use `PwaResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pwakit operations
pub type PwaResult<T> = Result<T, PwaError>;

/// All errors that can occur in pwakit
#[derive(Error, Debug)]
pub enum PwaError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("More than one {kind} source found ({}), refusing to guess", join_paths(.candidates))]
    AmbiguousSource {
        kind: &'static str,
        candidates: Vec<PathBuf>,
    },

    // Manifest errors
    #[error("Failed to read asset {path}: {source}")]
    AssetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid exclude pattern {pattern}: {reason}")]
    ExcludePattern { pattern: String, reason: String },

    #[error("Failed to persist manifest cache store {path}: {reason}")]
    StoreWrite { path: PathBuf, reason: String },

    // Bundler errors
    #[error("No bundler command configured for {0}")]
    BundlerNotConfigured(String),

    #[error("Bundler failed for {entry}: {stderr}")]
    BundlerFailed { entry: PathBuf, stderr: String },

    // Runtime cache errors
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Bad response for {url}: status {status}")]
    BadResponse { url: String, status: u16 },

    #[error("Cache quota exceeded while writing {0}")]
    QuotaExceeded(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl PwaError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error only degrades the result instead of aborting the build
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::StoreWrite { .. }
                | Self::Network { .. }
                | Self::BadResponse { .. }
                | Self::QuotaExceeded(_)
                | Self::BundlerFailed { .. }
                | Self::BundlerNotConfigured(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::AmbiguousSource { .. } => Some("Keep exactly one candidate file and remove the others"),
            Self::ConfigNotFound(_) => Some("Run: pwakit init"),
            Self::BundlerNotConfigured(_) => {
                Some("Set [bundler] command in pwakit.toml, e.g. [\"esbuild\", \"{entry}\", \"--bundle\", \"--outfile={outfile}\"]")
            }
            Self::AssetRead { .. } => Some("Check that the public directory is readable and not modified during the build"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = PwaError::ConfigNotFound(PathBuf::from("/app/pwakit.toml"));
        assert!(err.to_string().contains("pwakit.toml"));
    }

    #[test]
    fn ambiguous_source_lists_candidates() {
        let err = PwaError::AmbiguousSource {
            kind: "custom worker",
            candidates: vec![PathBuf::from("worker/index.ts"), PathBuf::from("worker/index.js")],
        };
        let msg = err.to_string();
        assert!(msg.contains("custom worker"));
        assert!(msg.contains("worker/index.ts"));
        assert!(msg.contains("worker/index.js"));
    }

    #[test]
    fn error_hint() {
        let err = PwaError::ConfigNotFound(PathBuf::from("pwakit.toml"));
        assert_eq!(err.hint(), Some("Run: pwakit init"));
        assert!(PwaError::Internal("x".into()).hint().is_none());
    }

    #[test]
    fn error_recoverable() {
        assert!(PwaError::QuotaExceeded("/".into()).is_recoverable());
        assert!(PwaError::network("/", "offline").is_recoverable());
        assert!(PwaError::BundlerNotConfigured("worker/index.ts".into()).is_recoverable());
        assert!(!PwaError::AmbiguousSource {
            kind: "custom worker",
            candidates: vec![],
        }
        .is_recoverable());
        assert!(!PwaError::AssetRead {
            path: PathBuf::from("public/a.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
        .is_recoverable());
    }
}
