//! Manifest command - print the precache manifest for the public directory

use crate::build::BuildPlan;
use crate::cli::args::{ManifestArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::PwaResult;
use crate::precache::{ChangeSummary, ManifestCacheStore, ManifestGenerator, PrecacheEntry};
use crate::ui::{HashProgress, UiContext};
use console::style;

/// Execute the manifest command
pub async fn execute(args: ManifestArgs, manager: &ConfigManager, config: &Config) -> PwaResult<()> {
    let ctx = UiContext::detect();
    let plan = BuildPlan::new(config.clone(), manager.project_dir());

    let progress = HashProgress::new(&ctx);
    let generator =
        ManifestGenerator::new(plan.generator_options())?.with_progress(progress.callback());
    let result = if args.full {
        generator.generate().map(|entries| (entries, None))
    } else {
        let store = ManifestCacheStore::new(plan.store_path());
        generator
            .generate_incremental(&store)
            .map(|report| (report.entries, Some(report.summary)))
    };
    progress.finish();
    let (entries, summary) = result?;

    match args.format {
        OutputFormat::Table => print_table(&entries, summary.as_ref()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Plain => {
            for entry in &entries {
                println!("{}", entry.url);
            }
        }
    }

    Ok(())
}

fn print_table(entries: &[PrecacheEntry], summary: Option<&ChangeSummary>) {
    if entries.is_empty() {
        println!("No precache entries.");
        return;
    }

    println!("{:<60} {:<34}", "URL", "REVISION");
    println!("{}", "-".repeat(94));
    for entry in entries {
        let revision = match &entry.revision {
            Some(revision) => revision.clone(),
            None => style("build id").dim().to_string(),
        };
        println!("{:<60} {:<34}", entry.url, revision);
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
    if let Some(summary) = summary {
        println!(
            "Since last build: {} added, {} changed, {} unchanged, {} removed",
            summary.added, summary.changed, summary.unchanged, summary.removed
        );
    }
}
