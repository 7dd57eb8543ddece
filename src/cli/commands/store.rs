//! Store command - inspect or clear the manifest cache store

use crate::build::BuildPlan;
use crate::cli::args::{OutputFormat, StoreAction, StoreArgs};
use crate::config::{Config, ConfigManager};
use crate::error::PwaResult;
use crate::precache::{ManifestCacheStore, StoreSnapshot};
use crate::ui::{self, UiContext};

/// Execute the store command
pub async fn execute(args: StoreArgs, manager: &ConfigManager, config: &Config) -> PwaResult<()> {
    let plan = BuildPlan::new(config.clone(), manager.project_dir());
    let store = ManifestCacheStore::new(plan.store_path());

    match args.action {
        StoreAction::Show { format } => show(&store, format),
        StoreAction::Clear { yes } => clear(&store, yes).await,
    }
}

fn show(store: &ManifestCacheStore, format: OutputFormat) -> PwaResult<()> {
    let snapshot = store.load();

    match format {
        OutputFormat::Table => print_table(store, &snapshot),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Plain => {
            for (path, _) in snapshot.iter() {
                println!("{}", path);
            }
        }
    }
    Ok(())
}

fn print_table(store: &ManifestCacheStore, snapshot: &StoreSnapshot) {
    println!("Store: {}", store.path().display());
    println!();

    if snapshot.is_empty() {
        println!("Store is empty. The next build hashes every asset.");
        return;
    }

    println!("{:<60} {:<34}", "PATH", "CONTENT ID");
    println!("{}", "-".repeat(94));
    for (path, record) in snapshot.iter() {
        println!("{:<60} {:<34}", path, record.hash);
    }
    println!();
    println!("Total: {} asset(s)", snapshot.len());
}

async fn clear(store: &ManifestCacheStore, yes: bool) -> PwaResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);
    let path = store.path().display().to_string();

    if !ui::confirm(&ctx, &format!("Delete {}?", path), false).await? {
        ui::remark(&ctx, "Aborted, pass --yes to clear without prompting");
        return Ok(());
    }

    if store.clear()? {
        ui::step_ok_detail(&ctx, "Manifest cache store cleared", &path);
    } else {
        ui::step_info(&ctx, "Manifest cache store does not exist");
    }
    Ok(())
}
