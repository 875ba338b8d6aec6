//! permadeploy: incremental deployment of static build output to
//! content-addressed, append-only storage.
//!
//! A run collects the deployable files under a root directory, hashes them,
//! diffs them against the previous deployment snapshot, uploads only what
//! changed and publishes a path manifest that maps every logical path to its
//! content identifier.

pub mod cli;
pub mod config;
pub mod deploy;
pub mod diff;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod mime;
pub mod store;
pub mod tree;
pub mod types;

pub use deploy::{DeployConfig, DeployMode, DeployOptions, DeployStage, Deployer, DeploymentResult};
pub use diff::{ChangeDetector, ChangeSet, ContentRecord, ReadErrorPolicy};
pub use error::{CollectError, ConfigError, DeployError, DeployErrorKind, DiffError, StoreError};
pub use manifest::{ManifestEntry, PublishedManifest, Snapshot};
