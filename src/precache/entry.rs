//! Precache manifest entries and URL helpers

use serde::{Deserialize, Serialize};

/// One `{ url, revision }` pair of the precache manifest
///
/// A `None` revision means the URL already embeds a content hash; it is
/// replaced by the build id before the manifest is handed off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheEntry {
    pub url: String,
    #[serde(default)]
    pub revision: Option<String>,
}

impl PrecacheEntry {
    pub fn new(url: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            revision: Some(revision.into()),
        }
    }

    /// Entry whose revision is resolved later from the build id
    pub fn unversioned(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            revision: None,
        }
    }
}

/// Join URL path segments POSIX-style and normalize the result
///
/// Repeated slashes collapse, `.` segments drop and `..` pops a segment.
/// A trailing slash on the last segment is preserved.
pub fn join_url(base: &str, path: &str) -> String {
    let joined = match (base.is_empty(), path.is_empty()) {
        (true, true) => return ".".to_string(),
        (true, false) => path.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, path),
    };
    normalize_url_path(&joined)
}

fn normalize_url_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    if trailing && !segments.is_empty() {
        out.push('/');
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Percent-escape the characters that break precache URL matching
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            '[' => out.push_str("%5B"),
            ']' => out.push_str("%5D"),
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// A rewrite applied to the whole manifest before hand-off
pub trait ManifestTransform: Send + Sync {
    fn transform(&self, entries: Vec<PrecacheEntry>) -> Vec<PrecacheEntry>;
}

/// Built-in transform
///
/// Repairs doubled `/_next//static/` prefixes, resolves unversioned entries
/// to the build id and escapes the URL.
pub struct DefaultTransform {
    build_id: String,
}

impl DefaultTransform {
    pub fn new(build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
        }
    }
}

impl ManifestTransform for DefaultTransform {
    fn transform(&self, entries: Vec<PrecacheEntry>) -> Vec<PrecacheEntry> {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let url = entry
                    .url
                    .replace("/_next//static/image", "/_next/static/image")
                    .replace("/_next//static/media", "/_next/static/media");
                PrecacheEntry {
                    url: escape_url(&url),
                    revision: entry.revision,
                }
            })
            .collect();
        resolve_revisions(entries, &self.build_id)
    }
}

/// Give every unversioned entry the build id as its revision
pub fn resolve_revisions(entries: Vec<PrecacheEntry>, build_id: &str) -> Vec<PrecacheEntry> {
    entries
        .into_iter()
        .map(|entry| PrecacheEntry {
            revision: Some(entry.revision.unwrap_or_else(|| build_id.to_string())),
            url: entry.url,
        })
        .collect()
}

/// Run transforms in order
pub fn apply_transforms(
    entries: Vec<PrecacheEntry>,
    transforms: &[Box<dyn ManifestTransform>],
) -> Vec<PrecacheEntry> {
    transforms
        .iter()
        .fold(entries, |entries, t| t.transform(entries))
}
