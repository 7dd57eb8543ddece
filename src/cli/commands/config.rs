//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{PwaError, PwaResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> PwaResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            let ctx = UiContext::detect();
            let mut config = config.clone();
            if let Err(e) = set_value(&mut config, &key, &value) {
                if !is_known_key(&key) {
                    ui::step_error_detail(&ctx, "Unknown config key", &key);
                    print_valid_keys();
                }
                return Err(e);
            }
            manager.save(&config).await?;
            ui::step_ok(&ctx, &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> PwaResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> PwaResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}

/// Keys accepted by `config set`
const KEYS: [&str; 39] = [
    "general.verbose",
    "general.log_format",
    "app.dir",
    "app.dist_dir",
    "app.public_dir",
    "app.base_path",
    "app.build_id",
    "app.modern",
    "worker.disable",
    "worker.register",
    "worker.dest",
    "worker.sw",
    "worker.scope",
    "worker.sw_src",
    "worker.custom_worker_dir",
    "worker.skip_waiting",
    "worker.clients_claim",
    "worker.cleanup_outdated_caches",
    "worker.import_scripts",
    "precache.enable_incremental_manifest",
    "precache.manifest_cache_file",
    "precache.public_excludes",
    "precache.build_excludes",
    "precache.disable_default_manifest_transform",
    "start_url.cache_start_url",
    "start_url.dynamic_start_url",
    "start_url.dynamic_start_url_redirect",
    "navigation.cache_on_front_end_nav",
    "navigation.reload_on_online",
    "fallbacks.enabled",
    "fallbacks.document",
    "fallbacks.image",
    "fallbacks.audio",
    "fallbacks.video",
    "fallbacks.font",
    "fallbacks.data",
    "bundler.command",
    "bundler.minify_flag",
    "bundler.external_flag",
];

fn is_known_key(key: &str) -> bool {
    KEYS.contains(&key)
}

/// Apply one dot-separated key to the config
fn set_value(config: &mut Config, key: &str, value: &str) -> PwaResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "verbose"] => config.general.verbose = parse_bool(value)?,
        ["general", "log_format"] => config.general.log_format = parse_log_format(value)?,

        ["app", "dir"] => config.app.dir = PathBuf::from(value),
        ["app", "dist_dir"] => config.app.dist_dir = PathBuf::from(value),
        ["app", "public_dir"] => config.app.public_dir = PathBuf::from(value),
        ["app", "base_path"] => config.app.base_path = value.to_string(),
        ["app", "build_id"] => config.app.build_id = optional(value),
        ["app", "modern"] => config.app.modern = parse_bool(value)?,

        ["worker", "disable"] => config.worker.disable = parse_bool(value)?,
        ["worker", "register"] => config.worker.register = parse_bool(value)?,
        ["worker", "dest"] => config.worker.dest = optional(value).map(PathBuf::from),
        ["worker", "sw"] => config.worker.sw = value.to_string(),
        ["worker", "scope"] => config.worker.scope = optional(value),
        ["worker", "sw_src"] => config.worker.sw_src = optional(value).map(PathBuf::from),
        ["worker", "custom_worker_dir"] => config.worker.custom_worker_dir = PathBuf::from(value),
        ["worker", "skip_waiting"] => config.worker.skip_waiting = parse_bool(value)?,
        ["worker", "clients_claim"] => config.worker.clients_claim = parse_bool(value)?,
        ["worker", "cleanup_outdated_caches"] => {
            config.worker.cleanup_outdated_caches = parse_bool(value)?
        }
        ["worker", "import_scripts"] => config.worker.import_scripts = parse_list(value),

        ["precache", "enable_incremental_manifest"] => {
            config.precache.enable_incremental_manifest = parse_bool(value)?
        }
        ["precache", "manifest_cache_file"] => {
            config.precache.manifest_cache_file = optional(value).map(PathBuf::from)
        }
        ["precache", "public_excludes"] => config.precache.public_excludes = parse_list(value),
        ["precache", "build_excludes"] => config.precache.build_excludes = parse_list(value),
        ["precache", "disable_default_manifest_transform"] => {
            config.precache.disable_default_manifest_transform = parse_bool(value)?
        }

        ["start_url", "cache_start_url"] => config.start_url.cache_start_url = parse_bool(value)?,
        ["start_url", "dynamic_start_url"] => {
            config.start_url.dynamic_start_url = parse_bool(value)?
        }
        ["start_url", "dynamic_start_url_redirect"] => {
            config.start_url.dynamic_start_url_redirect = optional(value)
        }

        ["navigation", "cache_on_front_end_nav"] => {
            config.navigation.cache_on_front_end_nav = parse_bool(value)?
        }
        ["navigation", "reload_on_online"] => {
            config.navigation.reload_on_online = parse_bool(value)?
        }

        ["fallbacks", "enabled"] => config.fallbacks.enabled = parse_bool(value)?,
        ["fallbacks", "document"] => config.fallbacks.document = optional(value),
        ["fallbacks", "image"] => config.fallbacks.image = optional(value),
        ["fallbacks", "audio"] => config.fallbacks.audio = optional(value),
        ["fallbacks", "video"] => config.fallbacks.video = optional(value),
        ["fallbacks", "font"] => config.fallbacks.font = optional(value),
        ["fallbacks", "data"] => config.fallbacks.data = optional(value),

        ["bundler", "command"] => {
            config.bundler.command = value.split_whitespace().map(str::to_string).collect()
        }
        ["bundler", "minify_flag"] => config.bundler.minify_flag = optional(value),
        ["bundler", "external_flag"] => config.bundler.external_flag = optional(value),

        _ => return Err(PwaError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

/// Empty string unsets
fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> PwaResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(PwaError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_log_format(value: &str) -> PwaResult<String> {
    match value {
        "text" | "json" => Ok(value.to_string()),
        _ => Err(PwaError::User(format!(
            "Invalid log format: {}. Use text or json",
            value
        ))),
    }
}

fn print_valid_keys() {
    eprintln!("Valid keys:");
    for key in KEYS {
        eprintln!("  {}", key);
    }
}
