//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::precache::ProgressFn;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for public asset hashing
///
/// Fed by the manifest generator's progress callback. Silent in CI, where a
/// line per file would drown the build log.
pub struct HashProgress {
    bar: Option<ProgressBar>,
}

impl HashProgress {
    pub fn new(ctx: &UiContext) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new(0);
            let template = ProgressStyle::with_template(
                "  {spinner:.magenta} Hashing assets  {bar:20.magenta/dim} {pos}/{len}  {elapsed:.dim}",
            );
            if let Ok(template) = template {
                bar.set_style(template.progress_chars("━╸─"));
            }
            bar
        });
        Self { bar }
    }

    /// Callback for [`ManifestGenerator::with_progress`](crate::precache::ManifestGenerator::with_progress)
    pub fn callback(&self) -> ProgressFn {
        let bar = self.bar.clone();
        Box::new(move |done, total| {
            if let Some(bar) = &bar {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            }
        })
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
