//! Error types for the deployment engine.

use crate::deploy::DeployStage;
use std::path::PathBuf;
use thiserror::Error;

/// Tree collection errors. Always fatal to a run.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Deployment root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("Deployment root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    #[error("Failed to walk directory: {0}")]
    Walk(String),

    #[error("Invalid exclusion rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },
}

/// Errors raised by the object store and metadata store collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Change detection errors
#[derive(Debug, Error)]
pub enum DiffError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    /// The previous snapshot could not be loaded; callers may fall back to a full upload.
    #[error("Incremental mode unavailable: {0}")]
    Unavailable(#[source] StoreError),

    #[error("Failed to read {path}: {reason}")]
    FileRead { path: String, reason: String },
}

/// What went wrong during a deployment run
#[derive(Debug, Error)]
pub enum DeployErrorKind {
    #[error(transparent)]
    Collection(#[from] CollectError),

    #[error("empty tree: no deployable files found")]
    EmptyTree,

    #[error("cannot read {path}: {reason}")]
    FileRead { path: String, reason: String },

    #[error("upload of {path} failed: {source}")]
    Upload {
        path: String,
        #[source]
        source: StoreError,
    },

    #[error("no entry point: no markup file found among deployed paths")]
    NoEntryPoint,

    #[error("publishing the manifest failed: {0}")]
    ManifestPublish(#[source] StoreError),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// A failed deployment run: the stage it failed in, how many files were
/// uploaded before the failure, and the cause.
#[derive(Debug, Error)]
#[error("Deployment failed during {stage} after {uploaded} file(s) uploaded: {kind}")]
pub struct DeployError {
    pub stage: DeployStage,
    pub uploaded: usize,
    #[source]
    pub kind: DeployErrorKind,
}

impl DeployError {
    pub fn new(stage: DeployStage, uploaded: usize, kind: impl Into<DeployErrorKind>) -> Self {
        Self {
            stage,
            uploaded,
            kind: kind.into(),
        }
    }

    pub fn is_no_entry_point(&self) -> bool {
        matches!(self.kind, DeployErrorKind::NoEntryPoint)
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed:\n{}", .0.join("\n"))]
    Invalid(Vec<String>),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
