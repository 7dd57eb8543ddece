//! Front-end navigation caching
//!
//! [`History`] is the page's history with an explicit observer hook. When
//! front-end navigation caching is on, the [`NavigationInterceptor`]
//! registers itself there and caches every route the user navigates to.

use crate::error::PwaResult;
use crate::runtime::config::RuntimeConfig;
use crate::runtime::http::Fetcher;
use crate::runtime::lifecycle::{cache_resource, PageEnvironment};
use crate::runtime::storage::{self, CacheStorage, MatchOptions, OTHERS_CACHE, START_URL_CACHE};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

/// How the history entry changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Push,
    Replace,
}

/// Notified after every history change
#[async_trait]
pub trait NavigationObserver: Send + Sync {
    async fn on_navigate(&self, kind: NavigationKind, url: &str);
}

/// Page history with observer registration
pub struct History {
    entries: RwLock<Vec<String>>,
    observers: RwLock<Vec<Arc<dyn NavigationObserver>>>,
}

impl History {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            entries: RwLock::new(vec![initial.into()]),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub async fn register(&self, observer: Arc<dyn NavigationObserver>) {
        self.observers.write().await.push(observer);
    }

    /// Current entry
    pub async fn location(&self) -> String {
        self.entries.read().await.last().cloned().unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn push_state(&self, url: impl Into<String>) {
        let url = url.into();
        self.entries.write().await.push(url.clone());
        self.notify(NavigationKind::Push, &url).await;
    }

    pub async fn replace_state(&self, url: impl Into<String>) {
        let url = url.into();
        {
            let mut entries = self.entries.write().await;
            match entries.last_mut() {
                Some(last) => *last = url.clone(),
                None => entries.push(url.clone()),
            }
        }
        self.notify(NavigationKind::Replace, &url).await;
    }

    async fn notify(&self, kind: NavigationKind, url: &str) {
        let observers = self.observers.read().await.clone();
        for observer in observers {
            observer.on_navigate(kind, url).await;
        }
    }
}

/// Caches routes visited through client-side navigation
pub struct NavigationInterceptor {
    start_url: Option<String>,
    env: Arc<dyn PageEnvironment>,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
}

impl NavigationInterceptor {
    /// `None` unless front-end navigation caching is on and the page supports it
    pub fn new(
        config: &RuntimeConfig,
        env: Arc<dyn PageEnvironment>,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Option<Arc<Self>> {
        if !config.cache_on_front_end_nav || !env.capabilities().supports_offline() {
            return None;
        }
        Some(Arc::new(Self {
            start_url: config.start_url.clone(),
            env,
            storage,
            fetcher,
        }))
    }

    /// Observe `history`
    pub async fn install(self: &Arc<Self>, history: &History) {
        history.register(self.clone()).await;
    }

    /// Cache the destination of a navigation; failures are logged
    pub async fn cache_on_navigation(&self, url: &str) {
        if !self.env.is_online() {
            debug!("Offline, not caching {}", url);
            return;
        }

        if self.start_url.as_deref() == Some(url) {
            cache_resource(self.storage.as_ref(), self.fetcher.as_ref(), url, START_URL_CACHE)
                .await;
            return;
        }

        if let Err(e) = self.cache_if_missing(url).await {
            error!("Error caching navigation resource {}: {}", url, e);
        }
    }

    /// Connection restored: cache the current location once
    pub async fn on_online(&self) {
        let location = self.env.location();
        self.cache_on_navigation(&location).await;
    }

    async fn cache_if_missing(&self, url: &str) -> PwaResult<()> {
        let cached = self
            .storage
            .match_url(OTHERS_CACHE, url, MatchOptions::ignore_search())
            .await?;
        if cached.is_some() {
            debug!("{} already cached", url);
            return Ok(());
        }
        storage::add(self.storage.as_ref(), self.fetcher.as_ref(), OTHERS_CACHE, url).await
    }
}

#[async_trait]
impl NavigationObserver for NavigationInterceptor {
    async fn on_navigate(&self, _kind: NavigationKind, url: &str) {
        self.cache_on_navigation(url).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::http::Response;
    use crate::runtime::lifecycle::tests::{FakeNetwork, FakePage};
    use crate::runtime::storage::MemoryCacheStorage;
    use std::sync::atomic::Ordering;

    fn nav_config() -> RuntimeConfig {
        RuntimeConfig {
            sw: "/sw.js".to_string(),
            scope: "/".to_string(),
            enable_register: true,
            start_url: Some("/".to_string()),
            cache_on_front_end_nav: true,
            reload_on_online: false,
            fallbacks: None,
        }
    }

    fn network() -> FakeNetwork {
        FakeNetwork::default()
            .with("/", Response::ok("/", b"home".to_vec()))
            .with("/about", Response::ok("/about", b"about".to_vec()))
            .with("/post?id=2", Response::ok("/post?id=2", b"post".to_vec()))
    }

    async fn setup(
        page: FakePage,
    ) -> (History, Arc<MemoryCacheStorage>, Arc<FakeNetwork>, Arc<FakePage>) {
        let page = Arc::new(page);
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = Arc::new(network());
        let history = History::new("/");
        let interceptor =
            NavigationInterceptor::new(&nav_config(), page.clone(), storage.clone(), network.clone())
                .unwrap();
        interceptor.install(&history).await;
        (history, storage, network, page)
    }

    #[test]
    fn disabled_without_flag() {
        let mut config = nav_config();
        config.cache_on_front_end_nav = false;
        let interceptor = NavigationInterceptor::new(
            &config,
            Arc::new(FakePage::new()),
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(network()),
        );
        assert!(interceptor.is_none());
    }

    #[tokio::test]
    async fn push_caches_into_others() {
        let (history, storage, _, _) = setup(FakePage::new()).await;

        history.push_state("/about").await;

        assert_eq!(history.location().await, "/about");
        assert_eq!(storage.keys(OTHERS_CACHE).await.unwrap(), vec!["/about"]);
    }

    #[tokio::test]
    async fn already_cached_url_not_written_again() {
        let (history, storage, network, _) = setup(FakePage::new()).await;
        storage
            .put(OTHERS_CACHE, "/post?id=1", Response::ok("/post?id=1", Vec::new()))
            .await
            .unwrap();
        let writes = storage.writes();

        history.push_state("/post?id=2").await;

        assert_eq!(storage.keys(OTHERS_CACHE).await.unwrap().len(), 1);
        assert_eq!(storage.writes(), writes);
        assert_eq!(network.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_url_goes_to_start_url_partition() {
        let (history, storage, _, _) = setup(FakePage::new()).await;

        history.replace_state("/").await;

        assert_eq!(history.len().await, 1);
        assert_eq!(storage.keys(START_URL_CACHE).await.unwrap(), vec!["/"]);
        assert!(storage.keys(OTHERS_CACHE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_navigation_skipped() {
        let page = FakePage::new();
        page.online.store(false, Ordering::SeqCst);
        let (history, storage, network, _) = setup(page).await;

        history.push_state("/about").await;

        assert_eq!(storage.writes(), 0);
        assert_eq!(network.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_fetch_is_swallowed() {
        let (history, storage, _, _) = setup(FakePage::new()).await;

        history.push_state("/not-on-the-network").await;

        assert!(storage.keys(OTHERS_CACHE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn online_caches_current_location() {
        let page = Arc::new(FakePage::new());
        *page.location.lock().unwrap() = "/about".to_string();
        let storage = Arc::new(MemoryCacheStorage::new());
        let interceptor =
            NavigationInterceptor::new(&nav_config(), page, storage.clone(), Arc::new(network()))
                .unwrap();

        interceptor.on_online().await;

        assert_eq!(storage.keys(OTHERS_CACHE).await.unwrap(), vec!["/about"]);
    }
}
