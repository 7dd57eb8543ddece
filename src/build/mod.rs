//! Build-time integration
//!
//! Everything `pwakit build` does on top of manifest generation: fallback
//! resolution, custom worker bundling, the routing table and the hand-off to
//! the caching engine.

pub mod engine;
pub mod fallback;
pub mod plan;
pub mod routes;
pub mod worker;

pub use engine::{CachingEngine, SpecFileEngine, WorkerMode, WorkerSpec, WORKER_SPEC_FILE};
pub use fallback::{resolve_fallbacks, OFFLINE_ROUTE};
pub use plan::{clean_stale_outputs, BuildOptions, BuildOutcome, BuildPlan};
pub use routes::{
    default_runtime_caching, dev_runtime_caching, AssetFilter, ExcludeRule, RouteRule, Strategy,
    UrlMatcher,
};
pub use worker::{build_custom_worker, BundleRequest, CommandBundler, WorkerBundler};
