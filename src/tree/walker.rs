//! Filesystem walker for collecting deployable files

use crate::error::CollectError;
use crate::tree::path;
use crate::types::LogicalPath;
use chrono::{DateTime, Utc};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A file discovered under the deployment root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Normalized path relative to the deployment root
    pub logical_path: LogicalPath,
    /// Where to read the bytes from
    pub absolute_location: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Collector configuration
///
/// Rules are passed in explicitly so synthetic trees can be collected with
/// whatever rule set a test needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectorConfig {
    /// Glob patterns matched against each segment of the root-relative path,
    /// or against the whole relative path when the pattern contains `/`
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// File extensions (without the dot, case-insensitive) eligible for deployment
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    /// Well-known entry point filename
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Whether to follow symbolic links (default: false)
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_exclude() -> Vec<String> {
    [
        ".git",
        ".svn",
        ".hg",
        ".env",
        ".env.*",
        "*.log",
        "*.md",
        "LICENSE*",
        "src",
        "scripts",
        "templates",
        "*.hbs",
        "*.ejs",
        "node_modules",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_allowed_extensions() -> Vec<String> {
    [
        "html",
        "htm",
        "css",
        "js",
        "mjs",
        "map",
        "json",
        "webmanifest",
        "xml",
        "txt",
        "svg",
        "png",
        "jpg",
        "jpeg",
        "gif",
        "webp",
        "avif",
        "ico",
        "woff",
        "woff2",
        "ttf",
        "otf",
        "eot",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub(crate) fn default_entry_point() -> String {
    "index.html".to_string()
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            allowed_extensions: default_allowed_extensions(),
            entry_point: default_entry_point(),
            follow_symlinks: false,
        }
    }
}

impl CollectorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_extensions.is_empty() {
            return Err("allowed_extensions cannot be empty".to_string());
        }
        if self.entry_point.trim().is_empty() {
            return Err("entry_point cannot be empty".to_string());
        }
        for rule in &self.exclude {
            if let Err(e) = Pattern::new(rule) {
                return Err(format!("invalid exclusion rule '{}': {}", rule, e));
            }
        }
        Ok(())
    }
}

struct ExclusionRule {
    pattern: Pattern,
    whole_path: bool,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Tree Collector
pub struct Collector {
    config: CollectorConfig,
    rules: Vec<ExclusionRule>,
    allowed: HashSet<String>,
}

impl Collector {
    /// Create a collector, compiling the exclusion rules up front
    pub fn new(config: CollectorConfig) -> Result<Self, CollectError> {
        let rules = config
            .exclude
            .iter()
            .map(|rule| {
                Pattern::new(rule.trim_end_matches('/'))
                    .map(|pattern| ExclusionRule {
                        pattern,
                        whole_path: rule.trim_end_matches('/').contains('/'),
                    })
                    .map_err(|e| CollectError::InvalidRule {
                        rule: rule.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let allowed = config
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();

        Ok(Self {
            config,
            rules,
            allowed,
        })
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Walk `root` and collect every deployable file
    ///
    /// Returns entries sorted by logical path for determinism.
    pub fn collect(&self, root: &Path) -> Result<Vec<FileEntry>, CollectError> {
        if !root.exists() {
            return Err(CollectError::RootMissing(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(CollectError::RootNotDirectory(root.to_path_buf()));
        }
        let root = dunce::canonicalize(root)
            .map_err(|e| CollectError::Walk(format!("{}: {}", root.display(), e)))?;

        let mut excluded = 0usize;
        let mut files: BTreeMap<LogicalPath, FileEntry> = BTreeMap::new();

        let walker = WalkDir::new(&root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();

        let mut iter = walker.into_iter();
        while let Some(entry) = iter.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(CollectError::Walk(e.to_string()));
                }
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            let Some(logical) = path::logical_path(&root, entry.path()) else {
                continue;
            };

            if self.is_excluded(&logical) {
                debug!(path = %logical, "Excluded by rule");
                excluded += 1;
                if entry.file_type().is_dir() {
                    iter.skip_current_dir();
                }
                continue;
            }

            if entry.file_type().is_dir() {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(path = %logical, error = %e, "Skipping entry without metadata");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            if !self.is_allowed(&logical) {
                debug!(path = %logical, "Extension not in allow-list");
                excluded += 1;
                continue;
            }

            if files.contains_key(&logical) {
                warn!(path = %logical, "Duplicate logical path after normalization, keeping first");
                excluded += 1;
                continue;
            }

            files.insert(
                logical.clone(),
                FileEntry {
                    logical_path: logical,
                    absolute_location: entry.path().to_path_buf(),
                    size_bytes: metadata.len(),
                    modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                },
            );
        }

        info!(
            root = %root.display(),
            collected = files.len(),
            excluded,
            "Collected deployable files"
        );

        if !files.contains_key(&self.config.entry_point) {
            warn!(
                entry_point = %self.config.entry_point,
                "Entry point not found among collected files"
            );
        }

        Ok(files.into_values().collect())
    }

    /// Check a root-relative logical path against the exclusion rules
    pub fn is_excluded(&self, logical: &str) -> bool {
        self.rules.iter().any(|rule| {
            if rule.whole_path {
                rule.pattern.matches_with(logical, MATCH_OPTIONS)
            } else {
                logical
                    .split('/')
                    .any(|segment| rule.pattern.matches_with(segment, MATCH_OPTIONS))
            }
        })
    }

    fn is_allowed(&self, logical: &str) -> bool {
        path::extension(logical)
            .map(|ext| self.allowed.contains(&ext))
            .unwrap_or(false)
    }
}
