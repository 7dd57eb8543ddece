//! Cache lifecycle controller
//!
//! Runs in the page. Reacts to worker lifecycle events and connectivity
//! changes by populating the `start-url` and `next-data` partitions. Every
//! population failure is logged and swallowed; nothing here ever fails the
//! page.

use crate::error::PwaResult;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::http::{Fetcher, Request, Response};
use crate::runtime::storage::{self, CacheStorage, NEXT_DATA_CACHE, START_URL_CACHE};
use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Host features the page runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub window: bool,
    pub service_worker: bool,
    pub cache_storage: bool,
}

impl Capabilities {
    pub fn full() -> Self {
        Self {
            window: true,
            service_worker: true,
            cache_storage: true,
        }
    }

    pub fn supports_offline(&self) -> bool {
        self.window && self.service_worker && self.cache_storage
    }
}

/// The page context
#[async_trait]
pub trait PageEnvironment: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn is_online(&self) -> bool;

    /// Scheme, host and port, e.g. `https://example.com`
    fn origin(&self) -> String;

    /// Current location path
    fn location(&self) -> String;

    /// Absolute URLs of resources fetched by the page so far
    fn resource_timing_entries(&self) -> Vec<String>;

    fn reload(&self);

    async fn register_worker(&self, script_url: &str, scope: &str) -> PwaResult<()>;
}

/// Message posted by the worker, `{ "type": ..., "payload": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WorkerMessage {
    pub const CACHE_UPDATED: &'static str = "CACHE_UPDATED";

    pub fn cache_updated(url: impl Into<String>) -> Self {
        Self {
            kind: Self::CACHE_UPDATED.to_string(),
            payload: serde_json::json!({ "updatedURL": url.into() }),
        }
    }

    /// URL named by a cache update message
    pub fn updated_url(&self) -> Option<&str> {
        if self.kind != Self::CACHE_UPDATED {
            return None;
        }
        self.payload.get("updatedURL")?.as_str()
    }
}

/// Events the controller reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Installed { is_update: bool },
    Waiting,
    Activated { is_update: bool },
    Message(WorkerMessage),
    Online,
}

/// A newer version of a cached URL is available
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateNotice {
    pub url: String,
}

impl fmt::Display for UpdateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A newer version of {} is available!", self.url)
    }
}

/// Fetch `url` and store it in `cache`, storing redirected responses as plain 200s
///
/// Failures are logged.
pub async fn cache_resource(
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    url: &str,
    cache: &str,
) {
    if let Err(e) = try_cache_resource(storage, fetcher, url, cache).await {
        error!("Error caching resource {} in cache {}: {}", url, cache, e);
    }
}

async fn try_cache_resource(
    storage: &dyn CacheStorage,
    fetcher: &dyn Fetcher,
    url: &str,
    cache: &str,
) -> PwaResult<()> {
    storage.open(cache).await?;
    let response = fetcher.fetch(&Request::get(url)).await?;
    storage.put(cache, url, response.normalize_redirect()).await
}

pub struct CacheLifecycleController {
    config: RuntimeConfig,
    env: Arc<dyn PageEnvironment>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheLifecycleController {
    /// Set up the controller; `None` when the page cannot run a worker with cache storage
    ///
    /// Makes sure the `start-url` partition exists and registers the worker
    /// when automatic registration is on.
    pub async fn attach(
        config: RuntimeConfig,
        env: Arc<dyn PageEnvironment>,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Option<Self> {
        if !env.capabilities().supports_offline() {
            debug!("Offline support unavailable in this context");
            return None;
        }

        let controller = Self {
            config,
            env,
            storage,
            fetcher,
        };
        controller.ensure_start_url_cached().await;

        if controller.config.enable_register {
            let script_url = format!("{}{}", controller.env.origin(), controller.config.sw);
            if let Err(e) = controller
                .env
                .register_worker(&script_url, &controller.config.scope)
                .await
            {
                error!("Service worker registration failed: {}", e);
            }
        }

        Some(controller)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// React to one event; returns a notice for update messages
    pub async fn handle(&self, event: WorkerEvent) -> Option<UpdateNotice> {
        match event {
            WorkerEvent::Installed { is_update: false } => {
                self.cache_start_url().await;
                self.cache_next_data().await;
                None
            }
            WorkerEvent::Activated { is_update: false } => {
                self.cache_start_url().await;
                None
            }
            WorkerEvent::Installed { is_update: true } | WorkerEvent::Activated { is_update: true } => {
                None
            }
            WorkerEvent::Waiting => {
                info!("A new service worker is waiting to activate.");
                None
            }
            WorkerEvent::Message(message) => {
                let notice = UpdateNotice {
                    url: message.updated_url()?.to_string(),
                };
                info!("{}", notice);
                Some(notice)
            }
            WorkerEvent::Online => {
                self.cache_start_url().await;
                if self.config.reload_on_online {
                    self.env.reload();
                }
                None
            }
        }
    }

    async fn ensure_start_url_cached(&self) {
        let Some(start_url) = &self.config.start_url else {
            return;
        };
        if let Err(e) = self.seed_start_url(start_url).await {
            error!("Error ensuring start URL is cached: {}", e);
        }
    }

    async fn seed_start_url(&self, start_url: &str) -> PwaResult<()> {
        if !self.storage.has(START_URL_CACHE).await? {
            self.storage
                .put(START_URL_CACHE, start_url, Response::ok(start_url, Vec::new()))
                .await?;
        }
        Ok(())
    }

    async fn cache_start_url(&self) {
        if let Some(start_url) = &self.config.start_url {
            cache_resource(
                self.storage.as_ref(),
                self.fetcher.as_ref(),
                start_url,
                START_URL_CACHE,
            )
            .await;
        }
    }

    /// Add every page data URL seen in resource timing to `next-data`
    async fn cache_next_data(&self) {
        let prefix = format!("{}/_next/data/", self.env.origin());
        let urls: Vec<String> = self
            .env
            .resource_timing_entries()
            .into_iter()
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".json"))
            .collect();

        if let Err(e) = self.storage.open(NEXT_DATA_CACHE).await {
            error!("Error caching Next.js data: {}", e);
            return;
        }

        let caches = self.storage.as_ref();
        let fetcher = self.fetcher.as_ref();
        let results = join_all(
            urls.iter()
                .map(|url| storage::add(caches, fetcher, NEXT_DATA_CACHE, url)),
        )
        .await;

        for (url, result) in urls.iter().zip(results) {
            if let Err(e) = result {
                error!("Error caching Next.js data {}: {}", url, e);
            }
        }
    }
}
