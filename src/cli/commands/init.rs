//! Init command - create a project pwakit.toml

use crate::cli::args::InitArgs;
use crate::config::CONFIG_FILE;
use crate::error::{PwaError, PwaResult};
use crate::ui::{self, UiContext};
use std::path::Path;
use tokio::fs;

/// Template for a new project config
const INIT_TEMPLATE: &str = r#"# pwakit project configuration
# Every key is optional; commented values are the defaults.

[app]
# dir = "."
# dist_dir = ".next"
# public_dir = "public"
# base_path = "/"
# modern = false

[worker]
# sw = "sw.js"
# register = true
# scope = "/"
# custom_worker_dir = "worker"
# skip_waiting = true

[precache]
# enable_incremental_manifest = true
# public_excludes = ["!noprecache/**/*"]
# build_excludes = []

[start_url]
# cache_start_url = true
# dynamic_start_url = true
# dynamic_start_url_redirect = "/login"

[navigation]
# cache_on_front_end_nav = false
# reload_on_online = true

[fallbacks]
# document = "/_offline"   # detected from pages/_offline.* when unset
# image = "/static/images/fallback.png"
# data = "fallback.json"   # resolved under /_next/data/<build id>/

[bundler]
# command = ["esbuild", "{entry}", "--bundle", "--platform=browser", "--outfile={outfile}"]
# minify_flag = "--minify"
# external_flag = "--external:{module}"
"#;

/// Execute the init command
pub async fn execute(args: InitArgs) -> PwaResult<()> {
    let ctx = UiContext::detect();

    let target_dir = match args.path {
        Some(ref p) => p.clone(),
        None => std::env::current_dir().map_err(|e| PwaError::io("getting current directory", e))?,
    };

    let config_path = target_dir.join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        return Err(PwaError::User(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    ensure_dir(&target_dir).await?;

    fs::write(&config_path, INIT_TEMPLATE)
        .await
        .map_err(|e| PwaError::io(format!("writing {}", config_path.display()), e))?;

    ui::step_ok_detail(
        &ctx,
        "Created project config",
        &config_path.display().to_string(),
    );
    ui::remark(&ctx, "Run `pwakit build` after your app build to generate the worker spec");

    Ok(())
}

async fn ensure_dir(dir: &Path) -> PwaResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| PwaError::io(format!("creating directory {}", dir.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    #[tokio::test]
    async fn init_creates_config() {
        let temp = TempDir::new().unwrap();
        let args = InitArgs {
            force: false,
            path: Some(temp.path().to_path_buf()),
        };
        execute(args).await.unwrap();

        let content = std::fs::read_to_string(temp.path().join(CONFIG_FILE)).unwrap();
        assert!(content.contains("[precache]"));
        assert!(content.contains("[fallbacks]"));
    }

    #[tokio::test]
    async fn init_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("apps").join("web");
        let args = InitArgs {
            force: false,
            path: Some(target.clone()),
        };
        execute(args).await.unwrap();
        assert!(target.join(CONFIG_FILE).exists());
    }

    #[tokio::test]
    async fn init_refuses_overwrite_without_force() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "existing").unwrap();

        let args = InitArgs {
            force: false,
            path: Some(temp.path().to_path_buf()),
        };
        let err = execute(args).await.unwrap_err().to_string();
        assert!(err.contains("already exists"));
    }

    #[tokio::test]
    async fn init_overwrites_with_force() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(CONFIG_FILE), "old content").unwrap();

        let args = InitArgs {
            force: true,
            path: Some(temp.path().to_path_buf()),
        };
        execute(args).await.unwrap();

        let content = std::fs::read_to_string(temp.path().join(CONFIG_FILE)).unwrap();
        assert!(content.contains("[worker]"));
    }

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(INIT_TEMPLATE).unwrap();
        assert_eq!(config.worker.sw, "sw.js");
        assert!(config.precache.enable_incremental_manifest);
    }
}
