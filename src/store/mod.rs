//! Storage collaborators
//!
//! The engine talks to two external stores:
//!
//! - an append-only [`ObjectStore`] that accepts immutable uploads and issues
//!   content identifiers (no delete, no overwrite)
//! - a [`MetadataStore`] holding the single deployment [`Snapshot`] document,
//!   read once at the start of a run and replaced wholesale at the end

pub mod http;
pub mod memory;
pub mod persistence;

pub use http::HttpObjectStore;
pub use memory::{MemoryMetadataStore, MemoryObjectStore};
pub use persistence::SledMetadataStore;

use crate::error::StoreError;
use crate::manifest::Snapshot;
use crate::types::ContentId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag attached to an uploaded object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Per-upload metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub content_type: String,
    pub tags: Vec<Tag>,
}

/// What the object store hands back for a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub content_id: ContentId,
    pub public_url: String,
}

/// Append-only object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload immutable bytes and receive their content identifier
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt, StoreError>;
}

/// Holder of the deployment snapshot document
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Load the last persisted snapshot, `None` if no deployment has happened yet
    async fn load_snapshot(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the persisted snapshot
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Upload endpoint of the object store gateway
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Public read base used to build object URLs
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Bearer token sent with uploads
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout for a single upload
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Directory of the local snapshot database (defaults to the platform data dir)
    #[serde(default)]
    pub metadata_path: Option<PathBuf>,

    /// Key of the snapshot document
    #[serde(default = "default_metadata_key")]
    pub metadata_key: String,
}

fn default_upload_url() -> String {
    "http://localhost:1984/upload".to_string()
}

fn default_gateway_url() -> String {
    "http://localhost:1984".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_metadata_key() -> String {
    "deployment-manifest".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            upload_url: default_upload_url(),
            gateway_url: default_gateway_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            metadata_path: None,
            metadata_key: default_metadata_key(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, url) in [("upload_url", &self.upload_url), ("gateway_url", &self.gateway_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("{} must be an http(s) URL, got '{}'", name, url));
            }
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than zero".to_string());
        }
        if self.metadata_key.trim().is_empty() {
            return Err("metadata_key cannot be empty".to_string());
        }
        Ok(())
    }

    /// Resolve the snapshot database directory
    pub fn resolve_metadata_path(&self) -> Option<PathBuf> {
        self.metadata_path.clone().or_else(|| {
            directories::ProjectDirs::from("", "", "permadeploy")
                .map(|dirs| dirs.data_dir().join("snapshots"))
        })
    }
}
