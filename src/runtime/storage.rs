//! Named cache partitions
//!
//! [`CacheStorage`] is the seam to the host's cache storage. Every operation
//! is atomic per key; the page and worker may race on the same key and the
//! last write wins. [`MemoryCacheStorage`] is the in-process implementation.

use crate::error::{PwaError, PwaResult};
use crate::runtime::http::{strip_search, Fetcher, Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Partition holding the start URL response
pub const START_URL_CACHE: &str = "start-url";

/// Partition holding page data fetched by the client
pub const NEXT_DATA_CACHE: &str = "next-data";

/// Partition holding pages cached during client-side navigation
pub const OTHERS_CACHE: &str = "others";

/// Options for cache lookups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Compare URLs without their query string
    pub ignore_search: bool,
}

impl MatchOptions {
    pub fn ignore_search() -> Self {
        Self {
            ignore_search: true,
        }
    }
}

/// Host cache storage
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Whether a partition exists
    async fn has(&self, cache: &str) -> PwaResult<bool>;

    /// Create the partition if it does not exist yet
    async fn open(&self, cache: &str) -> PwaResult<()>;

    /// Store a response under a URL, creating the partition if needed
    async fn put(&self, cache: &str, url: &str, response: Response) -> PwaResult<()>;

    /// Look up a URL in one partition
    async fn match_url(
        &self,
        cache: &str,
        url: &str,
        options: MatchOptions,
    ) -> PwaResult<Option<Response>>;

    /// Look up a URL across all partitions, oldest partition first
    async fn match_any(&self, url: &str, options: MatchOptions) -> PwaResult<Option<Response>>;

    /// URLs stored in a partition
    async fn keys(&self, cache: &str) -> PwaResult<Vec<String>>;

    /// Delete a partition; returns whether it existed
    async fn delete(&self, cache: &str) -> PwaResult<bool>;
}

/// Fetch a URL and store the response, rejecting non-2xx responses
pub async fn add(
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    cache: &str,
    url: &str,
) -> PwaResult<()> {
    let response = fetcher.fetch(&Request::get(url)).await?;
    if !response.is_ok() {
        return Err(PwaError::BadResponse {
            url: url.to_string(),
            status: response.status,
        });
    }
    storage.put(cache, url, response).await
}

#[derive(Debug, Clone)]
struct CachedResponse {
    url: String,
    response: Response,
    cached_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Partition {
    name: String,
    entries: Vec<CachedResponse>,
}

impl Partition {
    fn find(&self, url: &str, options: MatchOptions) -> Option<&CachedResponse> {
        if options.ignore_search {
            let wanted = strip_search(url);
            self.entries.iter().find(|e| strip_search(&e.url) == wanted)
        } else {
            self.entries.iter().find(|e| e.url == url)
        }
    }
}

/// In-memory cache storage
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    // Creation order is lookup order for match_any
    partitions: RwLock<Vec<Partition>>,
    max_entries: Option<usize>,
    writes: AtomicUsize,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total number of stored responses; puts beyond it fail with `QuotaExceeded`
    pub fn with_quota(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries),
            ..Self::default()
        }
    }

    /// Number of successful puts so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// When a URL was last stored in a partition
    pub async fn cached_at(&self, cache: &str, url: &str) -> Option<DateTime<Utc>> {
        let partitions = self.partitions.read().await;
        partitions
            .iter()
            .find(|p| p.name == cache)
            .and_then(|p| p.find(url, MatchOptions::default()))
            .map(|e| e.cached_at)
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn has(&self, cache: &str) -> PwaResult<bool> {
        Ok(self.partitions.read().await.iter().any(|p| p.name == cache))
    }

    async fn open(&self, cache: &str) -> PwaResult<()> {
        let mut partitions = self.partitions.write().await;
        if !partitions.iter().any(|p| p.name == cache) {
            partitions.push(Partition {
                name: cache.to_string(),
                entries: Vec::new(),
            });
        }
        Ok(())
    }

    async fn put(&self, cache: &str, url: &str, response: Response) -> PwaResult<()> {
        let mut partitions = self.partitions.write().await;

        let total: usize = partitions.iter().map(|p| p.entries.len()).sum();
        let replacing = partitions
            .iter()
            .find(|p| p.name == cache)
            .is_some_and(|p| p.entries.iter().any(|e| e.url == url));
        if let Some(max) = self.max_entries {
            if !replacing && total >= max {
                return Err(PwaError::QuotaExceeded(url.to_string()));
            }
        }

        let index = match partitions.iter().position(|p| p.name == cache) {
            Some(index) => index,
            None => {
                partitions.push(Partition {
                    name: cache.to_string(),
                    entries: Vec::new(),
                });
                partitions.len() - 1
            }
        };

        let entry = CachedResponse {
            url: url.to_string(),
            response,
            cached_at: Utc::now(),
        };
        let partition = &mut partitions[index];
        match partition.entries.iter_mut().find(|e| e.url == url) {
            Some(existing) => *existing = entry,
            None => partition.entries.push(entry),
        }

        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!("Cached {} in {}", url, cache);
        Ok(())
    }

    async fn match_url(
        &self,
        cache: &str,
        url: &str,
        options: MatchOptions,
    ) -> PwaResult<Option<Response>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|p| p.name == cache)
            .and_then(|p| p.find(url, options))
            .map(|e| e.response.clone()))
    }

    async fn match_any(&self, url: &str, options: MatchOptions) -> PwaResult<Option<Response>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find_map(|p| p.find(url, options))
            .map(|e| e.response.clone()))
    }

    async fn keys(&self, cache: &str) -> PwaResult<Vec<String>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|p| p.name == cache)
            .map(|p| p.entries.iter().map(|e| e.url.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete(&self, cache: &str) -> PwaResult<bool> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != cache);
        Ok(partitions.len() != before)
    }
}
