//! Tree Collector
//!
//! Walks a deployment root, applies exclusion rules and the extension
//! allow-list, and produces the ordered set of deployable files.

pub mod hasher;
pub mod path;
pub mod walker;

pub use walker::{Collector, CollectorConfig, FileEntry};
