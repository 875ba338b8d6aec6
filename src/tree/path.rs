//! Logical path normalization
//!
//! Every path that enters a manifest goes through [`normalize_logical_path`],
//! both when it is discovered on disk and when it is read back from a stored
//! snapshot, so the two sides of a diff are always comparable.

use std::path::{Component, Path};
use unicode_normalization::UnicodeNormalization;

/// Normalize a logical path string (without filesystem access)
///
/// This function:
/// 1. Normalizes Unicode to NFC
/// 2. Converts backslashes to forward slashes
/// 3. Collapses repeated slashes
/// 4. Strips any leading `./`
/// 5. Strips a single trailing slash
pub fn normalize_logical_path(path: &str) -> String {
    let normalized: String = path.nfc().collect();
    let slashed = normalized.replace('\\', "/");

    let mut collapsed = String::with_capacity(slashed.len());
    let mut previous_slash = false;
    for ch in slashed.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        collapsed.push(ch);
    }

    let mut result = collapsed.as_str();
    while let Some(rest) = result.strip_prefix("./") {
        result = rest;
    }

    let mut result = result.to_string();
    if result.len() > 1 && result.ends_with('/') {
        result.pop();
    }

    result
}

/// Build the logical path of `path` relative to `root`
///
/// Returns `None` when `path` is not under `root`.
pub fn logical_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;

    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if segments.is_empty() {
        return None;
    }

    Some(normalize_logical_path(&segments.join("/")))
}

/// Lowercased extension of a logical path, without the dot
pub fn extension(logical_path: &str) -> Option<String> {
    let file_name = logical_path.rsplit('/').next()?;
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
