//! Build-time precache manifest generation
//!
//! - `hasher`: content ids from file bytes
//! - `store`: the persisted path -> content id snapshot
//! - `entry`: manifest entries, URL joining and transforms
//! - `generator`: the public directory scan tying the three together

pub mod entry;
pub mod generator;
pub mod hasher;
pub mod store;

pub use entry::{
    apply_transforms, join_url, resolve_revisions, DefaultTransform, ManifestTransform,
    PrecacheEntry,
};
pub use generator::{
    ChangeSummary, ExcludeSet, GenerationReport, GeneratorOptions, ManifestGenerator,
    ProgressFn, RevisionPolicy, StoredRevision,
};
pub use hasher::ContentHasher;
pub use store::{AssetRecord, ManifestCacheStore, StoreSnapshot};
