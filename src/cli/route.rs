//! CLI route: run context and the command table. Builds collaborators from
//! configuration, dispatches to the engine, and hands results to presentation.

use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_change_set, format_collect_result, format_deploy_result, format_snapshot,
};
use crate::config::{ConfigLoader, PermadeployConfig};
use crate::deploy::{DeployConfig, DeployOptions, Deployer};
use crate::diff::ChangeDetector;
use crate::manifest::Snapshot;
use crate::store::{
    HttpObjectStore, MemoryMetadataStore, MemoryObjectStore, MetadataStore, ObjectStore,
    SledMetadataStore,
};
use crate::tree::Collector;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: loaded configuration plus the tokio runtime
pub struct RunContext {
    config: PermadeployConfig,
    runtime: tokio::runtime::Runtime,
    metadata: Mutex<Option<Arc<SledMetadataStore>>>,
}

impl RunContext {
    /// Load configuration from `workspace` (or `config_path`) and start a runtime
    pub fn new(workspace: PathBuf, config_path: Option<PathBuf>) -> Result<Self> {
        let config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ConfigLoader::load(&workspace)?,
        };
        Self::with_config(config)
    }

    pub fn with_config(config: PermadeployConfig) -> Result<Self> {
        let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
        Ok(Self {
            config,
            runtime,
            metadata: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &PermadeployConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Deploy {
                root,
                dry_run,
                force,
                batch_size,
                format,
            } => self.handle_deploy(root, *dry_run, *force, *batch_size, *format),
            Commands::Plan { root, format } => self.handle_plan(root, *format),
            Commands::Collect { root, format } => self.handle_collect(root, *format),
            Commands::Snapshot { format, clear } => self.handle_snapshot(*format, *clear),
        }
    }

    fn detector(&self) -> Result<ChangeDetector> {
        let collector = Collector::new(self.config.collector.clone())?;
        Ok(ChangeDetector::new(
            collector,
            self.config.deploy.read_error_policy,
        ))
    }

    /// Open the snapshot database once per context
    fn open_metadata(&self) -> Result<Arc<SledMetadataStore>> {
        let mut slot = self.metadata.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }

        let path = self
            .config
            .store
            .resolve_metadata_path()
            .ok_or_else(|| {
                anyhow!("no snapshot directory configured and no platform data directory available")
            })?;
        std::fs::create_dir_all(&path)
            .with_context(|| format!("creating snapshot directory {}", path.display()))?;
        let store = SledMetadataStore::new(&path, self.config.store.metadata_key.clone())
            .with_context(|| format!("opening snapshot database at {}", path.display()))?;
        let store = Arc::new(store);
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    fn handle_deploy(
        &self,
        root: &Path,
        dry_run: bool,
        force: bool,
        batch_size: Option<usize>,
        format: OutputFormat,
    ) -> Result<String> {
        let mut deploy_config: DeployConfig = self.config.deploy.clone();
        if let Some(size) = batch_size {
            deploy_config.batch_size = size;
        }
        deploy_config.validate().map_err(|e| anyhow!(e))?;

        let objects: Arc<dyn ObjectStore>;
        let metadata: Arc<dyn MetadataStore>;
        if dry_run {
            deploy_config.batch_delay_ms = 0;
            objects = Arc::new(MemoryObjectStore::new(self.config.store.gateway_url.clone()));
            metadata = Arc::new(self.dry_run_metadata());
        } else {
            objects = Arc::new(HttpObjectStore::new(&self.config.store)?);
            metadata = self.open_metadata()?;
        }

        info!(root = %root.display(), dry_run, force, "Starting deployment");
        let deployer = Deployer::new(self.detector()?, objects, metadata, deploy_config);
        let result = self
            .runtime
            .block_on(deployer.deploy_with(root, DeployOptions { force }))?;

        Ok(format_deploy_result(&result, format, dry_run)?)
    }

    /// Seed an in-memory snapshot from the real one so a dry run diffs the same way
    fn dry_run_metadata(&self) -> MemoryMetadataStore {
        let loaded = self
            .open_metadata()
            .and_then(|store| Ok(self.runtime.block_on(store.load_snapshot())?));
        match loaded {
            Ok(Some(snapshot)) => MemoryMetadataStore::with_snapshot(snapshot),
            Ok(None) => MemoryMetadataStore::new(),
            Err(e) => {
                warn!(error = %e, "Could not read stored snapshot, dry run diffs against nothing");
                MemoryMetadataStore::new()
            }
        }
    }

    fn handle_plan(&self, root: &Path, format: OutputFormat) -> Result<String> {
        let detector = self.detector()?;
        let metadata = self.open_metadata()?;
        let changes = self
            .runtime
            .block_on(detector.detect(root, metadata.as_ref()))?;
        Ok(format_change_set(&changes, format)?)
    }

    fn handle_collect(&self, root: &Path, format: OutputFormat) -> Result<String> {
        let collector = Collector::new(self.config.collector.clone())?;
        let entries = collector.collect(root)?;
        Ok(format_collect_result(&entries, format)?)
    }

    fn handle_snapshot(&self, format: OutputFormat, clear: bool) -> Result<String> {
        let metadata = self.open_metadata()?;
        if clear {
            metadata.clear()?;
            info!("Deployment snapshot cleared");
            return Ok("Deployment snapshot cleared.".to_string());
        }
        let snapshot: Option<Snapshot> = self.runtime.block_on(metadata.load_snapshot())?;
        Ok(format_snapshot(snapshot.as_ref(), format)?)
    }
}
