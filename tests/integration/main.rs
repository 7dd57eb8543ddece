//! Integration tests for pwakit

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn pwakit(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("pwakit");
        cmd.current_dir(dir).env_remove("PWAKIT_CONFIG");
        cmd
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("pwakit.toml"),
            "[app]\nbuild_id = \"it\"\n\n[fallbacks]\nimage = \"/fallback.png\"\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(dir.path().join("public/fallback.png"), b"png").unwrap();
        fs::write(dir.path().join("public/robots.txt"), b"User-agent: *").unwrap();
        dir
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        pwakit(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("offline cache layer"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        pwakit(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pwakit"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        pwakit(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("pwakit.toml"));
    }

    #[test]
    fn config_show() {
        let dir = project();
        pwakit(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[fallbacks]"))
            .stdout(predicate::str::contains("/fallback.png"));
    }

    #[test]
    fn config_set_unknown_key() {
        let dir = project();
        pwakit(dir.path())
            .args(["config", "set", "worker.nope", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn missing_explicit_config() {
        let dir = TempDir::new().unwrap();
        pwakit(dir.path())
            .args(["--config", "missing.toml", "build"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("pwakit init"));
    }

    #[test]
    fn init_writes_template() {
        let dir = TempDir::new().unwrap();
        pwakit(dir.path()).arg("init").assert().success();
        assert!(dir.path().join("pwakit.toml").exists());

        pwakit(dir.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn manifest_plain() {
        let dir = project();
        pwakit(dir.path())
            .args(["manifest", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("/fallback.png"))
            .stdout(predicate::str::contains("/robots.txt"));
    }

    #[test]
    fn manifest_json_parses() {
        let dir = project();
        let output = pwakit(dir.path())
            .args(["manifest", "--format", "json", "--full"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(entries.as_array().unwrap().len(), 2);
        assert_eq!(entries[0]["url"], "/fallback.png");
        assert_eq!(entries[0]["revision"].as_str().unwrap().len(), 32);
    }

    #[test]
    fn build_writes_outputs() {
        let dir = project();
        pwakit(dir.path())
            .arg("build")
            .assert()
            .success()
            .stdout(predicate::str::contains("Build complete"));

        let next = dir.path().join(".next");
        assert!(next.join("pwa-worker.json").exists());
        assert!(next.join("pwa-runtime.json").exists());
        assert!(next.join("manifest-cache.json").exists());

        let runtime: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(next.join("pwa-runtime.json")).unwrap())
                .unwrap();
        assert_eq!(runtime["sw"], "/sw.js");
        assert_eq!(runtime["fallbacks"]["image"], "/fallback.png");
        assert_eq!(runtime["fallbacks"]["document"], false);

        pwakit(dir.path())
            .args(["store", "show", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("robots.txt"));
    }

    #[test]
    fn store_clear_with_yes() {
        let dir = project();
        pwakit(dir.path()).arg("build").assert().success();

        pwakit(dir.path())
            .args(["store", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cleared"));
        assert!(!dir.path().join(".next/manifest-cache.json").exists());
    }
}

mod manifest_scenarios {
    use pwakit::precache::{
        ContentHasher, GeneratorOptions, ManifestCacheStore, ManifestGenerator, PrecacheEntry,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn changed_and_deleted_assets() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("a.png"), b"X").unwrap();
        fs::write(public.join("b.png"), b"Y").unwrap();

        let store = ManifestCacheStore::new(dir.path().join(".next/manifest-cache.json"));
        let generator = ManifestGenerator::new(GeneratorOptions::new(&public, "/")).unwrap();

        let first = generator.generate_incremental(&store).unwrap();
        assert_eq!(
            first.entries,
            vec![
                PrecacheEntry::new("/a.png", ContentHasher::hash_bytes(b"X")),
                PrecacheEntry::new("/b.png", ContentHasher::hash_bytes(b"Y")),
            ]
        );
        assert_eq!(store.load().len(), 2);

        fs::write(public.join("b.png"), b"Z").unwrap();
        fs::remove_file(public.join("a.png")).unwrap();

        let second = generator.generate_incremental(&store).unwrap();
        assert_eq!(
            second.entries,
            vec![PrecacheEntry::new("/b.png", ContentHasher::hash_bytes(b"Z"))]
        );
        assert_eq!(second.summary.changed, 1);
        assert_eq!(second.summary.removed, 1);

        let snapshot = store.load();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains("b.png"));
    }

    #[test]
    fn corrupted_store_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let public = dir.path().join("public");
        fs::create_dir_all(&public).unwrap();
        fs::write(public.join("a.png"), b"X").unwrap();
        let store_path = dir.path().join("manifest-cache.json");
        fs::write(&store_path, "{ not json").unwrap();

        let store = ManifestCacheStore::new(&store_path);
        let report = ManifestGenerator::new(GeneratorOptions::new(&public, "/"))
            .unwrap()
            .generate_incremental(&store)
            .unwrap();

        assert_eq!(report.summary.added, 1);
        assert_eq!(report.entries[0].revision.as_deref(), Some(ContentHasher::hash_bytes(b"X").as_str()));
    }
}

mod fallback_scenarios {
    use pwakit::runtime::storage::OTHERS_CACHE;
    use pwakit::runtime::{
        CacheStorage, Destination, FallbackResolver, FallbackTable, MemoryCacheStorage, Request,
        Response,
    };

    fn resolver() -> FallbackResolver {
        FallbackResolver::new(FallbackTable {
            document: Some("/_offline".to_string()),
            ..FallbackTable::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn document_served_from_cache() {
        let storage = MemoryCacheStorage::new();
        storage
            .put(OTHERS_CACHE, "/_offline", Response::ok("/_offline", b"offline".to_vec()))
            .await
            .unwrap();

        let request = Request::get("/articles/42").with_destination(Destination::Document);
        let response = resolver().resolve(&request, &storage).await;
        assert!(response.is_ok());
        assert_eq!(response.body, b"offline".to_vec());
    }

    #[tokio::test]
    async fn image_without_fallback_is_network_error() {
        let storage = MemoryCacheStorage::new();
        storage
            .put(OTHERS_CACHE, "/_offline", Response::ok("/_offline", b"offline".to_vec()))
            .await
            .unwrap();

        let request = Request::get("/logo.png").with_destination(Destination::Image);
        let response = resolver().resolve(&request, &storage).await;
        assert!(response.is_error());
    }
}
