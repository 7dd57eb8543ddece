//! Content hashing for precached assets
//!
//! Revisions are derived from file bytes only, so an untouched file keeps the
//! same content id across builds no matter when or where it is rebuilt.

use crate::error::{PwaError, PwaResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Length in hex characters of a content id
pub const CONTENT_ID_LEN: usize = 32;

/// Computes content ids for asset bytes
pub struct ContentHasher;

impl ContentHasher {
    /// Hash raw bytes into a fixed-length hex content id
    pub fn hash_bytes(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);

        // First 16 bytes of the digest; uniqueness within one asset set is all we need
        hex::encode(&digest[..CONTENT_ID_LEN / 2])
    }

    /// Read a file and hash its contents
    ///
    /// An unreadable file is an error: silently skipping it would drop the
    /// asset from the manifest.
    pub fn hash_file(path: &Path) -> PwaResult<String> {
        let contents = fs::read(path).map_err(|e| PwaError::AssetRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self::hash_bytes(&contents))
    }
}
