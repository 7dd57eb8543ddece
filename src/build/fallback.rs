//! Fallback table resolution
//!
//! Turns the `[fallbacks]` section into the table the worker consults,
//! auto-detecting an offline page when no document fallback is configured.

use crate::config::schema::FallbackConfig;
use crate::error::{PwaError, PwaResult};
use crate::precache::join_url;
use crate::runtime::fallback::FallbackTable;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Route of the auto-detected offline page
pub const OFFLINE_ROUTE: &str = "/_offline";

/// Resolve the fallback table; `None` when no category ends up with a fallback
pub fn resolve_fallbacks(
    config: &FallbackConfig,
    app_dir: &Path,
    build_id: &str,
    page_extensions: &[String],
) -> PwaResult<Option<FallbackTable>> {
    if !config.enabled {
        debug!("Fallbacks disabled");
        return Ok(None);
    }

    let document = match non_empty(&config.document) {
        Some(document) => Some(document),
        None => detect_offline_page(app_dir, page_extensions)?,
    };

    let data = non_empty(&config.data).map(|data| {
        if data.ends_with(".json") {
            join_url(&format!("/_next/data/{}", build_id), &data)
        } else {
            data
        }
    });

    let table = FallbackTable {
        document,
        image: non_empty(&config.image),
        audio: non_empty(&config.audio),
        video: non_empty(&config.video),
        font: non_empty(&config.font),
        data,
    };

    if table.is_empty() {
        return Ok(None);
    }

    info!("Fallback to precache routes when fetch failed from cache or network:");
    for (category, url) in table.routes() {
        info!("  {}: {}", category, url);
    }

    Ok(Some(table))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// `/_offline` when exactly one `_offline.<ext>` page exists
fn detect_offline_page(app_dir: &Path, page_extensions: &[String]) -> PwaResult<Option<String>> {
    let Some(pages_dir) = [app_dir.join("pages"), app_dir.join("src").join("pages")]
        .into_iter()
        .find(|dir| dir.is_dir())
    else {
        return Ok(None);
    };

    let candidates: Vec<PathBuf> = page_extensions
        .iter()
        .map(|ext| pages_dir.join(format!("_offline.{}", ext)))
        .filter(|path| path.is_file())
        .collect();

    match candidates.len() {
        0 => Ok(None),
        1 => {
            debug!("Offline page found: {}", candidates[0].display());
            Ok(Some(OFFLINE_ROUTE.to_string()))
        }
        _ => Err(PwaError::AmbiguousSource {
            kind: "offline page",
            candidates,
        }),
    }
}
