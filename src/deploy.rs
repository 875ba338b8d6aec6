//! Deployment Orchestrator
//!
//! Drives one deployment run:
//!
//! `Collecting → Diffing → (Incremental | FullFallback) → Uploading →
//! ManifestBuild → ManifestPublish → Done`, with `Failed` reachable from any
//! stage. Forced runs take the `FullFallback` branch. Persisting the new snapshot is best effort and never fails a run.
//!
//! Changed files are uploaded in fixed-size batches. All uploads of a batch
//! run concurrently and the whole batch is awaited before the next starts,
//! with a fixed pause in between to stay under provider rate limits. Content
//! identifiers issued before a failure stay valid but unreferenced; the store
//! is append-only, so that costs money but not correctness.

use crate::diff::{ChangeDetector, ChangeSet, ContentRecord, ReadErrorPolicy};
use crate::error::{DeployError, DeployErrorKind, DiffError};
use crate::manifest::{ManifestEntry, PublishedManifest, Snapshot};
use crate::mime;
use crate::store::{MetadataStore, ObjectStore, Tag, UploadOptions, UploadReceipt};
use crate::tree::hasher;
use crate::types::{ContentId, LogicalPath};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const TAG_ORIGINAL_PATH: &str = "Original-Path";
pub const TAG_CONTENT_HASH: &str = "Content-Hash";
pub const TAG_DEPLOYED_AT: &str = "Deployed-At";
pub const TAG_TYPE: &str = "Type";

/// Stages of a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    Collecting,
    Diffing,
    Incremental,
    FullFallback,
    Uploading,
    ManifestBuild,
    ManifestPublish,
    Done,
    Failed,
}

impl fmt::Display for DeployStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployStage::Collecting => "collecting",
            DeployStage::Diffing => "diffing",
            DeployStage::Incremental => "incremental",
            DeployStage::FullFallback => "full-fallback",
            DeployStage::Uploading => "uploading",
            DeployStage::ManifestBuild => "manifest-build",
            DeployStage::ManifestPublish => "manifest-publish",
            DeployStage::Done => "done",
            DeployStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// How the change set for a run was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployMode {
    /// Diffed against the previous snapshot
    Incremental,
    /// The previous snapshot could not be loaded; everything was uploaded
    FullFallback,
    /// The caller asked to ignore the previous snapshot
    Forced,
}

/// Orchestrator tunables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeployConfig {
    /// Maximum uploads in flight at once
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// File name the published manifest is uploaded under
    #[serde(default = "default_manifest_file_name")]
    pub manifest_file_name: String,

    #[serde(default)]
    pub read_error_policy: ReadErrorPolicy,
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    1000
}

fn default_manifest_file_name() -> String {
    "manifest.json".to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            manifest_file_name: default_manifest_file_name(),
            read_error_policy: ReadErrorPolicy::default(),
        }
    }
}

impl DeployConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".to_string());
        }
        if self.manifest_file_name.trim().is_empty() {
            return Err("manifest_file_name cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Per-run switches
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployOptions {
    /// Ignore the previous snapshot and upload everything
    pub force: bool,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub manifest_id: ContentId,
    pub manifest_url: String,
    pub entry_url: String,
    pub index_path: LogicalPath,
    pub files_uploaded: usize,
    pub files_unchanged: usize,
    pub files_deleted: usize,
    pub total_files: usize,
    pub bytes_uploaded: u64,
    pub deleted_paths: Vec<LogicalPath>,
    pub mode: DeployMode,
    pub warnings: Vec<String>,
    pub deployed_at: DateTime<Utc>,
}

type StageObserver = Arc<dyn Fn(DeployStage) + Send + Sync>;

/// Deployment Orchestrator
pub struct Deployer {
    detector: ChangeDetector,
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    config: DeployConfig,
    observer: Option<StageObserver>,
}

struct Uploaded {
    record: ContentRecord,
    receipt: UploadReceipt,
    content_hash: String,
    size: u64,
}

impl Deployer {
    pub fn new(
        detector: ChangeDetector,
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        config: DeployConfig,
    ) -> Self {
        Self {
            detector,
            objects,
            metadata,
            config,
            observer: None,
        }
    }

    /// Install a callback invoked on every stage transition
    pub fn with_observer(mut self, observer: impl Fn(DeployStage) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn detector(&self) -> &ChangeDetector {
        &self.detector
    }

    fn enter(&self, stage: DeployStage) {
        debug!(%stage, "Deployment stage");
        if let Some(observer) = &self.observer {
            observer(stage);
        }
    }

    fn fail(&self, stage: DeployStage, uploaded: usize, kind: impl Into<DeployErrorKind>) -> DeployError {
        let error = DeployError::new(stage, uploaded, kind);
        warn!(%stage, uploaded, error = %error.kind, "Deployment failed");
        self.enter(DeployStage::Failed);
        error
    }

    /// Diff `root` against the stored snapshot without uploading anything
    pub async fn plan(&self, root: &Path) -> Result<ChangeSet, DiffError> {
        self.detector.detect(root, self.metadata.as_ref()).await
    }

    /// Deploy `root` incrementally
    pub async fn deploy(&self, root: &Path) -> Result<DeploymentResult, DeployError> {
        self.deploy_with(root, DeployOptions::default()).await
    }

    pub async fn deploy_with(
        &self,
        root: &Path,
        options: DeployOptions,
    ) -> Result<DeploymentResult, DeployError> {
        let deployed_at = Utc::now();
        let mut warnings = Vec::new();

        self.enter(DeployStage::Collecting);
        self.enter(DeployStage::Diffing);
        let (changes, mode) = if options.force {
            info!("Forced deployment, ignoring previous snapshot");
            let changes = self
                .detector
                .diff(root, &Snapshot::empty())
                .map_err(|e| self.diff_failure(e))?;
            (changes, DeployMode::Forced)
        } else {
            match self.detector.detect(root, self.metadata.as_ref()).await {
                Ok(changes) => (changes, DeployMode::Incremental),
                Err(DiffError::Unavailable(e)) => {
                    let message = format!("Incremental mode unavailable, uploading all files: {}", e);
                    warn!(error = %e, "Incremental mode unavailable, falling back to full upload");
                    warnings.push(message);
                    let changes = self
                        .detector
                        .diff(root, &Snapshot::empty())
                        .map_err(|e| self.diff_failure(e))?;
                    (changes, DeployMode::FullFallback)
                }
                Err(e) => return Err(self.diff_failure(e)),
            }
        };

        if changes.total_files == 0 {
            return Err(self.fail(DeployStage::Diffing, 0, DeployErrorKind::EmptyTree));
        }

        self.enter(match mode {
            DeployMode::Incremental => DeployStage::Incremental,
            DeployMode::FullFallback | DeployMode::Forced => DeployStage::FullFallback,
        });

        let ChangeSet {
            changed,
            unchanged,
            deleted,
            total_files,
        } = changes;

        self.enter(DeployStage::Uploading);
        let uploaded = self.upload_changed(changed, deployed_at).await?;
        let files_uploaded = uploaded.len();
        let bytes_uploaded = uploaded.iter().map(|u| u.size).sum();

        self.enter(DeployStage::ManifestBuild);
        let entries = Self::assemble_entries(&unchanged, &uploaded, deployed_at);
        let entry_point = &self.detector.collector().config().entry_point;
        let manifest = PublishedManifest::from_entries(&entries, entry_point).ok_or_else(|| {
            self.fail(
                DeployStage::ManifestBuild,
                files_uploaded,
                DeployErrorKind::NoEntryPoint,
            )
        })?;

        let snapshot = Snapshot::new(entries, deployed_at);
        if let Err(e) = self.metadata.save_snapshot(&snapshot).await {
            warn!(error = %e, "Failed to persist deployment snapshot; next run will upload everything");
            warnings.push(format!("Deployment snapshot was not persisted: {}", e));
        }

        self.enter(DeployStage::ManifestPublish);
        let receipt = self
            .publish_manifest(&manifest, deployed_at)
            .await
            .map_err(|kind| self.fail(DeployStage::ManifestPublish, files_uploaded, kind))?;

        let entry_url = format!(
            "{}/{}",
            receipt.public_url.trim_end_matches('/'),
            manifest.index.path
        );

        let result = DeploymentResult {
            manifest_id: receipt.content_id,
            manifest_url: receipt.public_url,
            entry_url,
            index_path: manifest.index.path.clone(),
            files_uploaded,
            files_unchanged: unchanged.len(),
            files_deleted: deleted.len(),
            total_files,
            bytes_uploaded,
            deleted_paths: deleted,
            mode,
            warnings,
            deployed_at,
        };

        info!(
            manifest_id = %result.manifest_id,
            uploaded = result.files_uploaded,
            unchanged = result.files_unchanged,
            deleted = result.files_deleted,
            total = result.total_files,
            "Deployment complete"
        );
        self.enter(DeployStage::Done);

        Ok(result)
    }

    fn diff_failure(&self, error: DiffError) -> DeployError {
        match error {
            DiffError::Collect(e) => self.fail(DeployStage::Collecting, 0, e),
            DiffError::FileRead { path, reason } => {
                self.fail(DeployStage::Diffing, 0, DeployErrorKind::FileRead { path, reason })
            }
            // `diff` never touches the metadata store.
            DiffError::Unavailable(e) => self.fail(
                DeployStage::Diffing,
                0,
                DeployErrorKind::Serialization(e.to_string()),
            ),
        }
    }

    async fn upload_changed(
        &self,
        changed: Vec<ContentRecord>,
        deployed_at: DateTime<Utc>,
    ) -> Result<Vec<Uploaded>, DeployError> {
        let batch_size = self.config.batch_size.max(1);
        let delay = Duration::from_millis(self.config.batch_delay_ms);
        let batch_count = changed.len().div_ceil(batch_size);
        let mut uploaded = Vec::with_capacity(changed.len());

        for (index, batch) in changed.chunks(batch_size).enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(batch = index + 1, of = batch_count, files = batch.len(), "Uploading batch");

            let results = join_all(batch.iter().map(|record| self.upload_record(record, deployed_at))).await;

            let mut first_error = None;
            for (record, result) in batch.iter().zip(results) {
                match result {
                    Ok((receipt, content_hash, size)) => uploaded.push(Uploaded {
                        record: record.clone(),
                        receipt,
                        content_hash,
                        size,
                    }),
                    Err(kind) => {
                        warn!(path = %record.logical_path(), error = %kind, "Upload failed");
                        if first_error.is_none() {
                            first_error = Some(kind);
                        }
                    }
                }
            }

            if let Some(kind) = first_error {
                return Err(self.fail(DeployStage::Uploading, uploaded.len(), kind));
            }
        }

        Ok(uploaded)
    }

    async fn upload_record(
        &self,
        record: &ContentRecord,
        deployed_at: DateTime<Utc>,
    ) -> Result<(UploadReceipt, String, u64), DeployErrorKind> {
        let path = record.logical_path();

        let Some(expected_hash) = record.content_hash.as_deref() else {
            return Err(DeployErrorKind::FileRead {
                path: path.to_string(),
                reason: record
                    .read_error
                    .clone()
                    .unwrap_or_else(|| "content hash unavailable".to_string()),
            });
        };

        let bytes = tokio::fs::read(&record.entry.absolute_location)
            .await
            .map_err(|e| DeployErrorKind::FileRead {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let content_hash = hasher::compute_content_hash(&bytes);
        if content_hash != expected_hash {
            warn!(path = %path, "File changed between hashing and upload, recording uploaded bytes");
        }
        let size = bytes.len() as u64;

        let options = UploadOptions {
            content_type: mime::content_type_for(path).to_string(),
            tags: vec![
                Tag::new(TAG_ORIGINAL_PATH, path),
                Tag::new(TAG_CONTENT_HASH, content_hash.as_str()),
                Tag::new(TAG_DEPLOYED_AT, timestamp(deployed_at)),
            ],
        };
        let file_name = path.rsplit('/').next().unwrap_or(path);

        let receipt = self
            .objects
            .upload(bytes, file_name, options)
            .await
            .map_err(|source| DeployErrorKind::Upload {
                path: path.to_string(),
                source,
            })?;
        debug!(path = %path, content_id = %receipt.content_id, "Uploaded");

        Ok((receipt, content_hash, size))
    }

    fn assemble_entries(
        unchanged: &[ContentRecord],
        uploaded: &[Uploaded],
        deployed_at: DateTime<Utc>,
    ) -> BTreeMap<LogicalPath, ManifestEntry> {
        let mut entries = BTreeMap::new();

        for record in unchanged {
            if let (Some(content_id), Some(content_hash)) = (&record.content_id, &record.content_hash) {
                entries.insert(
                    record.entry.logical_path.clone(),
                    ManifestEntry {
                        content_id: content_id.clone(),
                        content_hash: content_hash.clone(),
                        size_bytes: record.entry.size_bytes,
                        last_modified: record.entry.modified.or(Some(deployed_at)),
                    },
                );
            }
        }

        for upload in uploaded {
            entries.insert(
                upload.record.entry.logical_path.clone(),
                ManifestEntry {
                    content_id: upload.receipt.content_id.clone(),
                    content_hash: upload.content_hash.clone(),
                    size_bytes: upload.size,
                    last_modified: upload.record.entry.modified.or(Some(deployed_at)),
                },
            );
        }

        entries
    }

    async fn publish_manifest(
        &self,
        manifest: &PublishedManifest,
        deployed_at: DateTime<Utc>,
    ) -> Result<UploadReceipt, DeployErrorKind> {
        let bytes = manifest
            .to_bytes()
            .map_err(|e| DeployErrorKind::Serialization(e.to_string()))?;

        let options = UploadOptions {
            content_type: mime::MANIFEST_CONTENT_TYPE.to_string(),
            tags: vec![
                Tag::new(TAG_TYPE, "manifest"),
                Tag::new(TAG_DEPLOYED_AT, timestamp(deployed_at)),
            ],
        };

        self.objects
            .upload(bytes, &self.config.manifest_file_name, options)
            .await
            .map_err(DeployErrorKind::ManifestPublish)
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
