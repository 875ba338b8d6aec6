//! Content hashing for deployable files using BLAKE3

use crate::types::ContentHash;
use blake3::Hasher;
use std::fs::File;
use std::io;
use std::path::Path;

/// Compute content hash for file bytes
///
/// Returns the lowercase hex digest, which is also the form stored in snapshots.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hasher.finalize().to_hex().to_string()
}

/// Hash a file's full contents without loading it into memory at once
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
