//! End-to-end deployment behavior against in-memory stores

use super::test_utils::{site, write_file, Harness};
use permadeploy::deploy::DeployMode;
use permadeploy::manifest::{MANIFEST_PROTOCOL, MANIFEST_VERSION};
use std::fs;

#[tokio::test]
async fn test_redeploying_unchanged_tree_uploads_nothing() {
    let site = site(&[
        ("index.html", "<h1>home</h1>"),
        ("css/site.css", "body{}"),
        ("js/app.js", "console.log(1)"),
    ]);
    let harness = Harness::new();

    let first = harness.deployer.deploy(site.path()).await.unwrap();
    assert_eq!(first.files_uploaded, 3);
    assert_eq!(first.mode, DeployMode::Incremental);
    let uploads_after_first = harness.objects.upload_count();

    let second = harness.deployer.deploy(site.path()).await.unwrap();
    assert_eq!(second.files_uploaded, 0);
    assert_eq!(second.files_unchanged, 3);
    assert_eq!(second.bytes_uploaded, 0);
    // Only the manifest object itself is uploaded again.
    assert_eq!(harness.objects.upload_count(), uploads_after_first + 1);

    let first_manifest = harness.published_manifest(&first.manifest_id);
    let second_manifest = harness.published_manifest(&second.manifest_id);
    assert_eq!(first_manifest.paths, second_manifest.paths);
    assert_ne!(first.manifest_id, second.manifest_id);
}

#[tokio::test]
async fn test_single_modified_file_is_the_only_upload() {
    let site = site(&[
        ("index.html", "home"),
        ("about.html", "about"),
        ("css/site.css", "body{}"),
        ("img/logo.svg", "<svg/>"),
    ]);
    let harness = Harness::new();
    let first = harness.deployer.deploy(site.path()).await.unwrap();

    write_file(site.path(), "css/site.css", "body{color:red}");
    let second = harness.deployer.deploy(site.path()).await.unwrap();

    assert_eq!(second.files_uploaded, 1);
    assert_eq!(second.files_unchanged, 3);
    assert_eq!(second.total_files, 4);

    let before = harness.published_manifest(&first.manifest_id);
    let after = harness.published_manifest(&second.manifest_id);
    assert_ne!(before.paths["css/site.css"], after.paths["css/site.css"]);
    assert_eq!(before.paths["index.html"], after.paths["index.html"]);
    assert_eq!(before.paths["img/logo.svg"], after.paths["img/logo.svg"]);
}

#[tokio::test]
async fn test_inconsistent_snapshot_keys_do_not_look_new() {
    let site = site(&[("index.html", "home"), ("css/site.css", "body{}")]);
    let harness = Harness::new();
    harness.deployer.deploy(site.path()).await.unwrap();

    // Rewrite the stored snapshot the way older tooling keyed it.
    let mut snapshot = harness.metadata.snapshot().unwrap();
    let css = snapshot.entries.remove("css/site.css").unwrap();
    let index = snapshot.entries.remove("index.html").unwrap();
    snapshot.entries.insert(".\\css\\\\site.css".to_string(), css);
    snapshot.entries.insert("./index.html".to_string(), index);
    let messy = permadeploy::store::MemoryMetadataStore::with_snapshot(snapshot);
    let deployer = super::test_utils::deployer_with(
        harness.objects.clone(),
        std::sync::Arc::new(messy),
        super::test_utils::deploy_config(10),
    );

    let result = deployer.deploy(site.path()).await.unwrap();
    assert_eq!(result.files_uploaded, 0);
    assert_eq!(result.files_unchanged, 2);
    assert_eq!(result.files_deleted, 0);
}

#[tokio::test]
async fn test_entry_point_selection() {
    let harness = Harness::new();

    let with_index = site(&[("a.css", "a"), ("b.html", "b"), ("index.html", "i")]);
    let result = harness.deployer.deploy(with_index.path()).await.unwrap();
    assert_eq!(result.index_path, "index.html");
    assert_eq!(
        harness.published_manifest(&result.manifest_id).index.path,
        "index.html"
    );

    let without_index = site(&[("a.css", "a"), ("b.html", "b"), ("c.htm", "c")]);
    let harness = Harness::new();
    let result = harness.deployer.deploy(without_index.path()).await.unwrap();
    assert_eq!(result.index_path, "b.html");

    let no_markup = site(&[("a.css", "a")]);
    let harness = Harness::new();
    let err = harness.deployer.deploy(no_markup.path()).await.unwrap_err();
    assert!(err.is_no_entry_point());
    assert_eq!(err.uploaded, 1);
}

#[tokio::test]
async fn test_deleted_file_is_reported_but_not_removed() {
    let site = site(&[("index.html", "home"), ("old.js", "legacy")]);
    let harness = Harness::new();
    let first = harness.deployer.deploy(site.path()).await.unwrap();
    let old_id = harness.published_manifest(&first.manifest_id).paths["old.js"]
        .id
        .clone();

    fs::remove_file(site.path().join("old.js")).unwrap();
    let second = harness.deployer.deploy(site.path()).await.unwrap();

    assert_eq!(second.files_deleted, 1);
    assert_eq!(second.deleted_paths, vec!["old.js".to_string()]);
    let manifest = harness.published_manifest(&second.manifest_id);
    assert!(!manifest.paths.contains_key("old.js"));
    assert!(!harness.metadata.snapshot().unwrap().entries.contains_key("old.js"));
    // The object store is append-only; the old object is still there.
    assert!(harness.objects.objects().iter().any(|o| o.content_id == old_id));
}

#[tokio::test]
async fn test_second_run_scenario() {
    let index = "x".repeat(2048);
    let site = site(&[
        ("index.html", index.as_str()),
        ("style.css", &"a".repeat(1024)),
        ("old.js", "console.log('old')"),
    ]);
    let harness = Harness::new();
    harness.deployer.deploy(site.path()).await.unwrap();

    write_file(site.path(), "style.css", "b".repeat(1024));
    fs::remove_file(site.path().join("old.js")).unwrap();
    let result = harness.deployer.deploy(site.path()).await.unwrap();

    assert_eq!(result.files_uploaded, 1);
    assert_eq!(result.files_unchanged, 1);
    assert_eq!(result.files_deleted, 1);
    assert_eq!(result.total_files, 2);
    assert_eq!(result.bytes_uploaded, 1024);

    let manifest = harness.published_manifest(&result.manifest_id);
    assert_eq!(manifest.paths.len(), 2);
    assert_eq!(manifest.index.path, "index.html");
    assert_eq!(manifest.manifest, MANIFEST_PROTOCOL);
    assert_eq!(manifest.version, MANIFEST_VERSION);
    assert_eq!(
        result.entry_url,
        format!("memory://objects/{}/index.html", result.manifest_id)
    );
    assert_eq!(result.manifest_url, format!("memory://objects/{}", result.manifest_id));
}

#[tokio::test]
async fn test_manifest_wire_shape() {
    let site = site(&[("index.html", "home"), ("css/site.css", "body{}")]);
    let harness = Harness::new();
    let result = harness.deployer.deploy(site.path()).await.unwrap();

    let object = harness
        .objects
        .objects()
        .into_iter()
        .find(|o| o.content_id == result.manifest_id)
        .unwrap();
    assert_eq!(object.file_name, "manifest.json");
    assert_eq!(
        object.options.content_type,
        "application/x-deployment-manifest+json"
    );

    let value: serde_json::Value = serde_json::from_slice(&object.bytes).unwrap();
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys.len(), 4);
    assert_eq!(value["manifest"], "arweave/paths");
    assert_eq!(value["version"], "0.1.0");
    assert_eq!(value["index"]["path"], "index.html");
    assert!(value["paths"]["css/site.css"]["id"].is_string());
}

#[tokio::test]
async fn test_snapshot_records_every_deployed_file() {
    let site = site(&[("index.html", "home"), ("app.js", "1")]);
    let harness = Harness::new();
    let result = harness.deployer.deploy(site.path()).await.unwrap();

    let snapshot = harness.metadata.snapshot().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.deployed_at, Some(result.deployed_at));
    let entry = snapshot.get("app.js").unwrap();
    assert_eq!(entry.size_bytes, 1);
    assert_eq!(entry.content_hash.len(), 64);
    assert!(entry.last_modified.is_some());
    assert_eq!(harness.metadata.save_count(), 1);
}
