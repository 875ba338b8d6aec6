//! Deployment records
//!
//! Two distinct manifest shapes live here:
//!
//! - [`Snapshot`] is the private deployment record persisted to the metadata
//!   store. It carries hashes and sizes so the next run can diff against it.
//!   It is loaded once per run and replaced wholesale, never patched.
//! - [`PublishedManifest`] is the public wire object uploaded to the object
//!   store. It carries only what the storage backend's path addressing needs.

use crate::tree::path::{self, normalize_logical_path};
use crate::types::{ContentHash, ContentId, LogicalPath};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Protocol name of the published path manifest
pub const MANIFEST_PROTOCOL: &str = "arweave/paths";

/// Protocol version of the published path manifest
pub const MANIFEST_VERSION: &str = "0.1.0";

/// Extensions treated as markup when falling back from the well-known entry point
pub const MARKUP_EXTENSIONS: &[&str] = &["html", "htm"];

/// One persisted file record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    #[serde(default)]
    pub content_id: ContentId,
    #[serde(default)]
    pub content_hash: ContentHash,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ManifestEntry {
    /// A prior entry is only trusted for reuse when both its identifier and hash are present
    pub fn is_well_formed(&self) -> bool {
        !self.content_id.trim().is_empty() && !self.content_hash.trim().is_empty()
    }
}

/// The previous run's complete deployment record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: BTreeMap<LogicalPath, ManifestEntry>,
}

impl Snapshot {
    /// An empty snapshot: the state before the first deployment
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(entries: BTreeMap<LogicalPath, ManifestEntry>, deployed_at: DateTime<Utc>) -> Self {
        Self {
            deployed_at: Some(deployed_at),
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, logical_path: &str) -> Option<&ManifestEntry> {
        self.entries.get(logical_path)
    }

    /// Re-key every entry with the collector's normalization
    ///
    /// Records written by older code may use inconsistent separators. When two
    /// keys collapse onto the same normalized path the first in key order wins.
    pub fn normalized(self) -> Self {
        let mut entries = BTreeMap::new();
        for (key, entry) in self.entries {
            let normalized = normalize_logical_path(&key);
            if entries.contains_key(&normalized) {
                warn!(
                    path = %key,
                    normalized = %normalized,
                    "Duplicate snapshot path after normalization, keeping first"
                );
                continue;
            }
            entries.insert(normalized, entry);
        }
        Self {
            deployed_at: self.deployed_at,
            entries,
        }
    }
}

/// `{ "id": <content id> }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathTarget {
    pub id: ContentId,
}

/// `{ "path": <logical path> }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexTarget {
    pub path: LogicalPath,
}

/// The manifest object uploaded to the object store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishedManifest {
    pub manifest: String,
    pub version: String,
    pub index: IndexTarget,
    pub paths: BTreeMap<LogicalPath, PathTarget>,
}

impl PublishedManifest {
    /// Build a manifest from the deployed entries
    ///
    /// Returns `None` when no entry point can be chosen.
    pub fn from_entries(
        entries: &BTreeMap<LogicalPath, ManifestEntry>,
        entry_point: &str,
    ) -> Option<Self> {
        let index = select_entry_point(entries.keys().map(String::as_str), entry_point)?;
        let paths = entries
            .iter()
            .map(|(path, entry)| {
                (
                    path.clone(),
                    PathTarget {
                        id: entry.content_id.clone(),
                    },
                )
            })
            .collect();

        Some(Self {
            manifest: MANIFEST_PROTOCOL.to_string(),
            version: MANIFEST_VERSION.to_string(),
            index: IndexTarget { path: index },
            paths,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Choose the manifest index path
///
/// The well-known entry point wins if present; otherwise the lexicographically
/// first markup file. `None` if there is no markup file at all.
pub fn select_entry_point<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    entry_point: &str,
) -> Option<LogicalPath> {
    let mut first_markup: Option<&str> = None;
    for candidate in paths {
        if candidate == entry_point {
            return Some(candidate.to_string());
        }
        let is_markup = path::extension(candidate)
            .map(|ext| MARKUP_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false);
        if is_markup && first_markup.map_or(true, |current| candidate < current) {
            first_markup = Some(candidate);
        }
    }
    first_markup.map(str::to_string)
}
