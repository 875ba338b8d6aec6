//! Shared test utilities for integration tests
//!
//! Synthetic site trees, deployers wired to in-memory stores, and serialized
//! access to the XDG environment variables.

use permadeploy::deploy::{DeployConfig, Deployer};
use permadeploy::diff::{ChangeDetector, ReadErrorPolicy};
use permadeploy::manifest::PublishedManifest;
use permadeploy::store::{MemoryMetadataStore, MemoryObjectStore, MetadataStore, ObjectStore};
use permadeploy::tree::{Collector, CollectorConfig};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Write `contents` at `relative` under `root`, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: impl AsRef<[u8]>) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// A temporary site populated with `(path, contents)` pairs
pub fn site(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, contents) in files {
        write_file(dir.path(), path, contents);
    }
    dir
}

pub fn deploy_config(batch_size: usize) -> DeployConfig {
    DeployConfig {
        batch_size,
        batch_delay_ms: 0,
        ..DeployConfig::default()
    }
}

pub fn detector(policy: ReadErrorPolicy) -> ChangeDetector {
    ChangeDetector::new(Collector::new(CollectorConfig::default()).unwrap(), policy)
}

/// Deployer over arbitrary stores with default collection rules and no batch delay
pub fn deployer_with(
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    config: DeployConfig,
) -> Deployer {
    Deployer::new(detector(config.read_error_policy), objects, metadata, config)
}

/// In-memory stores plus a deployer over them
pub struct Harness {
    pub objects: Arc<MemoryObjectStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub deployer: Deployer,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(deploy_config(10))
    }

    pub fn with_config(config: DeployConfig) -> Self {
        let objects = Arc::new(MemoryObjectStore::default());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let deployer = deployer_with(objects.clone(), metadata.clone(), config);
        Self {
            objects,
            metadata,
            deployer,
        }
    }

    /// The manifest document uploaded under `manifest_id`
    pub fn published_manifest(&self, manifest_id: &str) -> PublishedManifest {
        let object = self
            .objects
            .objects()
            .into_iter()
            .find(|o| o.content_id == manifest_id)
            .expect("manifest object was uploaded");
        serde_json::from_slice(&object.bytes).unwrap()
    }
}

/// Environment variable state to restore after a test
struct EnvState {
    vars: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture(names: &[&'static str]) -> Self {
        Self {
            vars: names.iter().map(|n| (*n, std::env::var(n).ok())).collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.vars {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with `XDG_CONFIG_HOME` and `HOME` pointing into `test_dir`, plus the
/// given extra variables set, restoring everything afterwards
pub fn with_env<F, R>(test_dir: &TempDir, extra: &[(&'static str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let mut names = vec!["HOME", "XDG_CONFIG_HOME"];
    names.extend(extra.iter().map(|(name, _)| *name));
    let env_state = EnvState::capture(&names);

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();
    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path());
    for (name, value) in extra {
        std::env::set_var(name, value);
    }

    let result = f();

    env_state.restore();
    result
}
