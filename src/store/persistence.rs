//! Sled-backed snapshot persistence

use crate::error::StoreError;
use crate::manifest::Snapshot;
use crate::store::MetadataStore;
use async_trait::async_trait;
use std::path::Path;

/// Sled-based implementation of MetadataStore
///
/// The snapshot is one JSON document under a single key; saving replaces it.
pub struct SledMetadataStore {
    db: sled::Db,
    key: String,
}

impl SledMetadataStore {
    /// Open (or create) a snapshot database at the given directory
    pub fn new<P: AsRef<Path>>(path: P, key: impl Into<String>) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Database(format!("Failed to open sled database: {}", e)))?;
        Ok(Self::from_db(db, key))
    }

    /// Wrap an already open database
    pub fn from_db(db: sled::Db, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }

    /// Remove the stored snapshot, so the next run behaves like a first deployment
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db
            .remove(self.key.as_bytes())
            .map_err(|e| StoreError::Database(format!("Failed to remove snapshot: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for SledMetadataStore {
    async fn load_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        match self
            .db
            .get(self.key.as_bytes())
            .map_err(|e| StoreError::Database(format!("Failed to get snapshot: {}", e)))?
        {
            Some(value) => {
                let snapshot: Snapshot = serde_json::from_slice(&value)?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let value = serde_json::to_vec(snapshot)?;
        self.db
            .insert(self.key.as_bytes(), value)
            .map_err(|e| StoreError::Database(format!("Failed to put snapshot: {}", e)))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| StoreError::Database(format!("Failed to flush database: {}", e)))?;
        Ok(())
    }
}
