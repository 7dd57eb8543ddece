//! pwakit - offline cache layer for web app builds
//!
//! Build side: incremental precache manifests, offline fallbacks and the
//! worker spec handed to a caching engine. Page side: the cache lifecycle
//! controller and navigation interceptor driven by the runtime config.

pub mod build;
pub mod cli;
pub mod config;
pub mod error;
pub mod precache;
pub mod runtime;
pub mod ui;

pub use error::{PwaError, PwaResult};
