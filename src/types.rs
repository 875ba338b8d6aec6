//! Shared type aliases used across the collector, detector and orchestrator.

/// Forward-slash normalized path relative to the deployment root
pub type LogicalPath = String;

/// Lowercase hex BLAKE3 digest of a file's full contents
pub type ContentHash = String;

/// Opaque identifier issued by the object store for an uploaded object
pub type ContentId = String;
