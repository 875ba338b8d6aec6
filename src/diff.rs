//! Change Detector
//!
//! Hashes every collected file and classifies it against the previous
//! deployment snapshot as changed/new, unchanged, or deleted.

use crate::error::DiffError;
use crate::manifest::Snapshot;
use crate::store::MetadataStore;
use crate::tree::hasher;
use crate::tree::{Collector, FileEntry};
use crate::types::{ContentHash, ContentId, LogicalPath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What to do when a collected file cannot be read or hashed
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadErrorPolicy {
    /// Classify the file as changed with no hash; the upload step reports the failure
    #[default]
    Defer,
    /// Abort change detection on the first unreadable file
    FailFast,
}

/// A hashed, classified file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub entry: FileEntry,
    /// `None` when the file could not be read
    pub content_hash: Option<ContentHash>,
    /// True when no previous snapshot entry exists at this path
    pub is_new: bool,
    pub content_id: Option<ContentId>,
    pub public_url: Option<String>,
    /// Why reading or hashing failed, if it did
    pub read_error: Option<String>,
}

impl ContentRecord {
    pub fn logical_path(&self) -> &str {
        &self.entry.logical_path
    }
}

/// Result of diffing the current tree against a snapshot
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub changed: Vec<ContentRecord>,
    pub unchanged: Vec<ContentRecord>,
    pub deleted: Vec<LogicalPath>,
    pub total_files: usize,
}

impl ChangeSet {
    /// Files whose read failed during hashing
    pub fn unreadable(&self) -> impl Iterator<Item = &ContentRecord> {
        self.changed.iter().filter(|r| r.read_error.is_some())
    }
}

/// Change Detector
#[derive(Clone)]
pub struct ChangeDetector {
    collector: Arc<Collector>,
    read_error_policy: ReadErrorPolicy,
}

impl ChangeDetector {
    pub fn new(collector: Collector, read_error_policy: ReadErrorPolicy) -> Self {
        Self {
            collector: Arc::new(collector),
            read_error_policy,
        }
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Load the previous snapshot from `metadata` and diff `root` against it
    ///
    /// A missing snapshot is a first deployment and diffs against an empty
    /// record. A store failure is reported as [`DiffError::Unavailable`].
    pub async fn detect(
        &self,
        root: &Path,
        metadata: &dyn MetadataStore,
    ) -> Result<ChangeSet, DiffError> {
        let previous = match metadata.load_snapshot().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                info!("No previous deployment snapshot, treating as first deployment");
                Snapshot::empty()
            }
            Err(e) => return Err(DiffError::Unavailable(e)),
        };
        self.diff(root, &previous)
    }

    /// Diff the files under `root` against `previous`
    pub fn diff(&self, root: &Path, previous: &Snapshot) -> Result<ChangeSet, DiffError> {
        let files = self.collector.collect(root)?;
        self.classify(files, previous)
    }

    /// Hash already-collected `files` and classify them against `previous`
    pub fn classify(
        &self,
        files: Vec<FileEntry>,
        previous: &Snapshot,
    ) -> Result<ChangeSet, DiffError> {
        let previous = previous.clone().normalized();

        let mut change_set = ChangeSet {
            total_files: files.len(),
            ..ChangeSet::default()
        };
        let current: HashSet<&str> = files.iter().map(|f| f.logical_path.as_str()).collect();

        for (path, _) in previous.entries.iter() {
            if !current.contains(path.as_str()) {
                change_set.deleted.push(path.clone());
            }
        }

        for entry in files {
            let prior = previous.get(&entry.logical_path);

            let hash = match hasher::hash_file(&entry.absolute_location) {
                Ok(hash) => hash,
                Err(e) => {
                    if self.read_error_policy == ReadErrorPolicy::FailFast {
                        return Err(DiffError::FileRead {
                            path: entry.logical_path,
                            reason: e.to_string(),
                        });
                    }
                    warn!(path = %entry.logical_path, error = %e, "Failed to read file for hashing");
                    change_set.changed.push(ContentRecord {
                        entry,
                        content_hash: None,
                        is_new: true,
                        content_id: None,
                        public_url: None,
                        read_error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            match prior {
                Some(prior) if prior.is_well_formed() && prior.content_hash == hash => {
                    debug!(path = %entry.logical_path, "Unchanged");
                    change_set.unchanged.push(ContentRecord {
                        entry,
                        content_hash: Some(hash),
                        is_new: false,
                        content_id: Some(prior.content_id.clone()),
                        public_url: None,
                        read_error: None,
                    });
                }
                _ => {
                    debug!(path = %entry.logical_path, new = prior.is_none(), "Changed");
                    change_set.changed.push(ContentRecord {
                        entry,
                        content_hash: Some(hash),
                        is_new: prior.is_none(),
                        content_id: None,
                        public_url: None,
                        read_error: None,
                    });
                }
            }
        }

        info!(
            total = change_set.total_files,
            changed = change_set.changed.len(),
            unchanged = change_set.unchanged.len(),
            deleted = change_set.deleted.len(),
            "Change detection complete"
        );

        Ok(change_set)
    }
}
