//! Offline fallbacks
//!
//! When the primary caching strategy fails, the resolver serves one
//! designated precached substitute per destination category. Anything it
//! cannot serve becomes a plain network error.

use crate::error::PwaResult;
use crate::runtime::http::{Destination, Request, Response};
use crate::runtime::storage::{CacheStorage, MatchOptions};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

static NEXT_DATA_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/_next/data/.+/.+\.json$").expect("static pattern"));

/// Whether a URL points at page data (`/_next/data/<build id>/<path>.json`)
pub fn is_next_data_url(url: &str) -> bool {
    NEXT_DATA_URL.is_match(url)
}

/// Destination categories that can carry a fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FallbackCategory {
    Document,
    Image,
    Audio,
    Video,
    Font,
    Data,
}

impl FallbackCategory {
    pub const ALL: [FallbackCategory; 6] = [
        Self::Document,
        Self::Image,
        Self::Audio,
        Self::Video,
        Self::Font,
        Self::Data,
    ];

    /// Category of a request, if it has one
    pub fn classify(request: &Request) -> Option<Self> {
        match &request.destination {
            Destination::Document => Some(Self::Document),
            Destination::Image => Some(Self::Image),
            Destination::Audio => Some(Self::Audio),
            Destination::Video => Some(Self::Video),
            Destination::Font => Some(Self::Font),
            Destination::Empty if is_next_data_url(&request.url) => Some(Self::Data),
            _ => None,
        }
    }
}

impl fmt::Display for FallbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Font => "font",
            Self::Data => "data",
        };
        write!(f, "{}", name)
    }
}

/// Fallback URL per category; `None` serializes as `false`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackTable {
    #[serde(default, with = "url_or_false")]
    pub document: Option<String>,
    #[serde(default, with = "url_or_false")]
    pub image: Option<String>,
    #[serde(default, with = "url_or_false")]
    pub audio: Option<String>,
    #[serde(default, with = "url_or_false")]
    pub video: Option<String>,
    #[serde(default, with = "url_or_false")]
    pub font: Option<String>,
    #[serde(default, with = "url_or_false")]
    pub data: Option<String>,
}

impl FallbackTable {
    pub fn get(&self, category: FallbackCategory) -> Option<&str> {
        let slot = match category {
            FallbackCategory::Document => &self.document,
            FallbackCategory::Image => &self.image,
            FallbackCategory::Audio => &self.audio,
            FallbackCategory::Video => &self.video,
            FallbackCategory::Font => &self.font,
            FallbackCategory::Data => &self.data,
        };
        slot.as_deref()
    }

    /// No category has a fallback
    pub fn is_empty(&self) -> bool {
        FallbackCategory::ALL.iter().all(|c| self.get(*c).is_none())
    }

    /// Configured categories and their URLs, in category order
    pub fn routes(&self) -> Vec<(FallbackCategory, &str)> {
        FallbackCategory::ALL
            .iter()
            .filter_map(|c| self.get(*c).map(|url| (*c, url)))
            .collect()
    }
}

mod url_or_false {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Url(String),
        Flag(bool),
    }

    pub fn serialize<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(url) => serializer.serialize_str(url),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Url(url) if url.is_empty() => Ok(None),
            Raw::Url(url) => Ok(Some(url)),
            Raw::Flag(false) => Ok(None),
            Raw::Flag(true) => Err(D::Error::custom("expected a fallback URL or false")),
        }
    }
}

/// Serves designated substitutes for failed requests
#[derive(Debug, Clone)]
pub struct FallbackResolver {
    table: FallbackTable,
}

impl FallbackResolver {
    /// `None` when the table has no fallback at all
    pub fn new(table: FallbackTable) -> Option<Self> {
        if table.is_empty() {
            None
        } else {
            Some(Self { table })
        }
    }

    pub fn table(&self) -> &FallbackTable {
        &self.table
    }

    /// Designated fallback URL for a request
    pub fn route_for(&self, request: &Request) -> Option<&str> {
        FallbackCategory::classify(request).and_then(|c| self.table.get(c))
    }

    /// Cached substitute for a failed request, or a network error
    pub async fn resolve(&self, request: &Request, storage: &dyn CacheStorage) -> Response {
        let Some(route) = self.route_for(request) else {
            debug!(
                "No fallback for {} (destination {:?})",
                request.url,
                request.destination.as_str()
            );
            return Response::error();
        };

        match storage.match_any(route, MatchOptions::ignore_search()).await {
            Ok(Some(response)) => {
                debug!("Serving fallback {} for {}", route, request.url);
                response
            }
            Ok(None) => {
                warn!("Fallback {} is not cached", route);
                Response::error()
            }
            Err(e) => {
                warn!("Fallback lookup for {} failed: {}", route, e);
                Response::error()
            }
        }
    }

    /// Pass a successful primary result through, resolve a fallback otherwise
    pub async fn handler_did_error(
        &self,
        primary: PwaResult<Response>,
        request: &Request,
        storage: &dyn CacheStorage,
    ) -> Response {
        match primary {
            Ok(response) if !response.is_error() => response,
            Ok(_) => self.resolve(request, storage).await,
            Err(e) => {
                debug!("Primary strategy failed for {}: {}", request.url, e);
                self.resolve(request, storage).await
            }
        }
    }
}
