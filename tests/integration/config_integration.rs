//! Layered configuration loading

use super::test_utils::with_env;
use permadeploy::config::ConfigLoader;
use permadeploy::diff::ReadErrorPolicy;
use permadeploy::error::ConfigError;
use std::fs;
use tempfile::TempDir;

fn write_global(config_home: &TempDir, contents: &str) {
    let dir = config_home.path().join("permadeploy");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_defaults_without_any_files() {
    let config_home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let config = with_env(&config_home, &[], || ConfigLoader::load(workspace.path())).unwrap();

    assert_eq!(config.deploy.batch_size, 10);
    assert_eq!(config.deploy.batch_delay_ms, 1000);
    assert_eq!(config.deploy.manifest_file_name, "manifest.json");
    assert_eq!(config.deploy.read_error_policy, ReadErrorPolicy::Defer);
    assert_eq!(config.store.metadata_key, "deployment-manifest");
    assert_eq!(config.logging.output, "stderr");
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let config_home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_global(
        &config_home,
        "[deploy]\nbatch_size = 5\nbatch_delay_ms = 250\n\n[store]\napi_key = \"global-key\"\n",
    );
    fs::write(
        workspace.path().join("permadeploy.toml"),
        "[deploy]\nbatch_size = 7\n",
    )
    .unwrap();

    let config = with_env(&config_home, &[], || ConfigLoader::load(workspace.path())).unwrap();

    assert_eq!(config.deploy.batch_size, 7);
    assert_eq!(config.deploy.batch_delay_ms, 250);
    assert_eq!(config.store.api_key.as_deref(), Some("global-key"));
}

#[test]
fn test_environment_overrides_files() {
    let config_home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("permadeploy.toml"),
        "[deploy]\nbatch_size = 7\n",
    )
    .unwrap();

    let config = with_env(
        &config_home,
        &[
            ("PERMADEPLOY__DEPLOY__BATCH_SIZE", "3"),
            ("PERMADEPLOY__COLLECTOR__EXCLUDE", ".git,drafts"),
            ("PERMADEPLOY__STORE__GATEWAY_URL", "https://gw.example"),
        ],
        || ConfigLoader::load(workspace.path()),
    )
    .unwrap();

    assert_eq!(config.deploy.batch_size, 3);
    assert_eq!(
        config.collector.exclude,
        vec![".git".to_string(), "drafts".to_string()]
    );
    assert_eq!(config.store.gateway_url, "https://gw.example");
}

#[test]
fn test_invalid_workspace_file_reports_all_problems() {
    let config_home = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("permadeploy.toml"),
        "[deploy]\nbatch_size = 0\n\n[store]\nupload_url = \"ftp://nowhere\"\n",
    )
    .unwrap();

    let result = with_env(&config_home, &[], || ConfigLoader::load(workspace.path()));

    match result {
        Err(ConfigError::Invalid(errors)) => {
            assert_eq!(errors.len(), 2);
            assert!(errors.iter().any(|e| e.starts_with("deploy:")));
            assert!(errors.iter().any(|e| e.starts_with("store:")));
        }
        other => panic!("expected validation failure, got {:?}", other),
    }
}
