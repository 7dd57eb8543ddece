//! Page and worker runtime
//!
//! The lifecycle controller and navigation interceptor drive cache
//! population from the page; the fallback resolver runs in the worker after
//! the caching engine's own strategies have failed. All of them read the
//! build-resolved [`RuntimeConfig`].

pub mod config;
pub mod fallback;
pub mod http;
pub mod lifecycle;
pub mod navigation;
pub mod storage;

pub use config::{RuntimeConfig, RUNTIME_CONFIG_FILE};
pub use fallback::{FallbackCategory, FallbackResolver, FallbackTable};
pub use http::{Destination, Fetcher, Request, Response, ResponseKind};
pub use lifecycle::{
    CacheLifecycleController, Capabilities, PageEnvironment, UpdateNotice, WorkerEvent,
    WorkerMessage,
};
pub use navigation::{History, NavigationInterceptor, NavigationKind, NavigationObserver};
pub use storage::{CacheStorage, MatchOptions, MemoryCacheStorage};

use std::sync::Arc;

/// Everything the page runs, wired together
pub struct PageRuntime {
    controller: CacheLifecycleController,
    interceptor: Option<Arc<NavigationInterceptor>>,
}

impl PageRuntime {
    /// Attach the controller and, when enabled, hook navigation caching into `history`
    ///
    /// `None` when the page lacks worker or cache storage support.
    pub async fn start(
        config: RuntimeConfig,
        env: Arc<dyn PageEnvironment>,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        history: &History,
    ) -> Option<Self> {
        let interceptor =
            NavigationInterceptor::new(&config, env.clone(), storage.clone(), fetcher.clone());
        let controller = CacheLifecycleController::attach(config, env, storage, fetcher).await?;

        if let Some(interceptor) = &interceptor {
            interceptor.install(history).await;
        }

        Some(Self {
            controller,
            interceptor,
        })
    }

    pub fn controller(&self) -> &CacheLifecycleController {
        &self.controller
    }

    /// Route an event to the components that care about it
    pub async fn dispatch(&self, event: WorkerEvent) -> Option<UpdateNotice> {
        if event == WorkerEvent::Online {
            if let Some(interceptor) = &self.interceptor {
                interceptor.on_online().await;
            }
        }
        self.controller.handle(event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::lifecycle::tests::{FakeNetwork, FakePage};
    use crate::runtime::storage::{OTHERS_CACHE, START_URL_CACHE};
    use std::sync::atomic::Ordering;

    fn config(front_end_nav: bool) -> RuntimeConfig {
        RuntimeConfig {
            sw: "/sw.js".to_string(),
            scope: "/".to_string(),
            enable_register: false,
            start_url: Some("/".to_string()),
            cache_on_front_end_nav: front_end_nav,
            reload_on_online: true,
            fallbacks: None,
        }
    }

    #[tokio::test]
    async fn online_reaches_both_components() {
        let page = Arc::new(FakePage::new());
        *page.location.lock().unwrap() = "/about".to_string();
        let storage = Arc::new(MemoryCacheStorage::new());
        let network = FakeNetwork::default()
            .with("/", Response::ok("/", b"home".to_vec()))
            .with("/about", Response::ok("/about", b"about".to_vec()));
        let history = History::new("/about");

        let runtime = PageRuntime::start(
            config(true),
            page.clone(),
            storage.clone(),
            Arc::new(network),
            &history,
        )
        .await
        .unwrap();
        runtime.dispatch(WorkerEvent::Online).await;

        assert_eq!(storage.keys(OTHERS_CACHE).await.unwrap(), vec!["/about"]);
        let start = storage
            .match_url(START_URL_CACHE, "/", MatchOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(start.body, b"home");
        assert_eq!(page.reloads.load(Ordering::SeqCst), 1);
        assert!(page.registered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn navigation_not_hooked_when_disabled() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let history = History::new("/");

        PageRuntime::start(
            config(false),
            Arc::new(FakePage::new()),
            storage.clone(),
            Arc::new(FakeNetwork::default()),
            &history,
        )
        .await
        .unwrap();
        history.push_state("/about").await;

        assert!(storage.keys(OTHERS_CACHE).await.unwrap().is_empty());
    }
}
