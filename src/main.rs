//! pwakit - offline cache layer for web app builds
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use pwakit::cli::{Cli, Commands};
use pwakit::config::{Config, ConfigManager};
use pwakit::error::{PwaError, PwaResult};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> PwaResult<()> {
    let cli = Cli::parse();

    // Init command doesn't need config loading
    if let Commands::Init(args) = cli.command {
        init_logging(cli.verbose, &Config::default());
        return pwakit::cli::commands::init(args).await;
    }

    let manager = match cli.config {
        Some(path) => {
            if !path.exists() && !matches!(cli.command, Commands::Config(_)) {
                return Err(PwaError::ConfigNotFound(path));
            }
            ConfigManager::with_path(path)
        }
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| PwaError::io("getting current directory", e))?;
            match ConfigManager::find_project_config(&cwd) {
                Some(path) => ConfigManager::with_path(path),
                None => ConfigManager::new(&cwd),
            }
        }
    };

    let config = manager.load().await?;
    init_logging(cli.verbose, &config);
    pwakit::ui::init_theme();
    debug!("Using config {}", manager.path().display());

    match cli.command {
        Commands::Init(_) => unreachable!("Init handled above"),
        Commands::Build(args) => pwakit::cli::commands::build(args, &manager, &config).await,
        Commands::Manifest(args) => pwakit::cli::commands::manifest(args, &manager, &config).await,
        Commands::Store(args) => pwakit::cli::commands::store(args, &manager, &config).await,
        Commands::Config(args) => pwakit::cli::commands::config(args, &manager, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as one level
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.saturating_add(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("pwakit=warn"),
        1 => EnvFilter::new("pwakit=info"),
        _ => EnvFilter::new("pwakit=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
