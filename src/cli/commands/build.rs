//! Build command - produce the worker spec, manifest and runtime config

use crate::build::{BuildOptions, BuildOutcome, BuildPlan};
use crate::cli::args::BuildArgs;
use crate::config::{Config, ConfigManager};
use crate::error::PwaResult;
use crate::ui::{self, HashProgress, UiContext};

/// Execute the build command
pub async fn execute(args: BuildArgs, manager: &ConfigManager, config: &Config) -> PwaResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, if args.dev { "pwakit build (dev)" } else { "pwakit build" });

    let options = BuildOptions {
        dev: args.dev,
        build_id: args.build_id,
    };
    let progress = HashProgress::new(&ctx);
    let mut plan =
        BuildPlan::new(config.clone(), manager.project_dir()).with_progress(progress.callback());
    let outcome = plan.run(&options).await;
    progress.finish();

    let Some(outcome) = outcome? else {
        ui::outro_warn(&ctx, "PWA support is disabled (worker.disable = true)");
        return Ok(());
    };
    ui::step_ok_detail(&ctx, "Build complete", &outcome.build_id);

    report(&ctx, &outcome);
    ui::outro_success(&ctx, &format!("Service worker spec written to {}", outcome.dest_dir.display()));
    Ok(())
}

fn report(ctx: &UiContext, outcome: &BuildOutcome) {
    ui::section(ctx, "Worker");
    ui::key_value(ctx, "build id", &outcome.build_id);
    ui::key_value(ctx, "worker", &outcome.sw_path.display().to_string());
    ui::key_value(ctx, "url", &outcome.runtime_config.sw);
    ui::key_value(ctx, "scope", &outcome.runtime_config.scope);
    if let Some(name) = &outcome.custom_worker {
        ui::key_value(ctx, "custom worker", name);
    }
    if !outcome.removed.is_empty() {
        ui::key_value(ctx, "stale outputs removed", &outcome.removed.len().to_string());
    }

    ui::section(ctx, "Precache manifest");
    ui::key_value(ctx, "entries", &outcome.manifest.len().to_string());
    match &outcome.summary {
        Some(summary) => ui::key_value(
            ctx,
            "changes",
            &format!(
                "{} added, {} changed, {} unchanged, {} removed",
                summary.added, summary.changed, summary.unchanged, summary.removed
            ),
        ),
        None => ui::remark(ctx, "Incremental manifest disabled, every file was hashed"),
    }

    match &outcome.runtime_config.fallbacks {
        Some(table) => {
            ui::section(ctx, "Offline fallbacks");
            for (category, url) in table.routes() {
                ui::key_value(ctx, &category.to_string(), url);
            }
            if table.document.is_none() {
                ui::step_warn_hint(
                    ctx,
                    "No document fallback",
                    "Add pages/_offline.tsx or set fallbacks.document",
                );
            }
        }
        None => ui::remark(ctx, "No offline fallbacks configured"),
    }

    if !outcome.runtime_config.enable_register {
        ui::step_info(ctx, "Auto registration disabled, register the worker from the page");
    }
}
