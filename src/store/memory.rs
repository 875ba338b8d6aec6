//! In-process stores
//!
//! Used for `--dry-run` deployments and as test doubles. Both stores can be
//! told to fail so the orchestrator's error paths can be exercised.

use crate::error::StoreError;
use crate::manifest::Snapshot;
use crate::store::{MetadataStore, ObjectStore, UploadOptions, UploadReceipt};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An object accepted by [`MemoryObjectStore`]
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_id: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub options: UploadOptions,
}

impl StoredObject {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.options
            .tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// Append-only in-memory object store
///
/// Every upload gets a fresh identifier, even for identical bytes.
pub struct MemoryObjectStore {
    gateway_url: String,
    objects: Mutex<Vec<StoredObject>>,
    failing: Mutex<HashSet<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            objects: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Make every upload whose file name or original path equals `name` fail
    pub fn fail_on(&self, name: impl Into<String>) {
        self.failing.lock().insert(name.into());
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().clone()
    }

    pub fn upload_count(&self) -> usize {
        self.objects.lock().len()
    }

    /// Highest number of uploads observed in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn should_fail(&self, file_name: &str, options: &UploadOptions) -> bool {
        let failing = self.failing.lock();
        failing.contains(file_name)
            || options
                .tags
                .iter()
                .any(|t| t.name == crate::deploy::TAG_ORIGINAL_PATH && failing.contains(&t.value))
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://objects")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        options: UploadOptions,
    ) -> Result<UploadReceipt, StoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        // Let sibling uploads in the same batch start before this one finishes.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.should_fail(file_name, &options) {
            return Err(StoreError::Unavailable(format!(
                "upload of {} rejected",
                file_name
            )));
        }

        let mut objects = self.objects.lock();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(objects.len() as u64).to_be_bytes());
        hasher.update(file_name.as_bytes());
        hasher.update(&bytes);
        let content_id = hasher.finalize().to_hex().as_str()[..43].to_string();

        objects.push(StoredObject {
            content_id: content_id.clone(),
            file_name: file_name.to_string(),
            bytes,
            options,
        });

        Ok(UploadReceipt {
            public_url: format!("{}/{}", self.gateway_url, content_id),
            content_id,
        })
    }
}

/// In-memory snapshot holder
#[derive(Default)]
pub struct MemoryMetadataStore {
    snapshot: Mutex<Option<Snapshot>>,
    unavailable: AtomicBool,
    reject_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::default();
        *store.snapshot.lock() = Some(snapshot);
        store
    }

    /// Make loads fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make saves fail while loads keep working
    pub fn set_reject_saves(&self, reject: bool) {
        self.reject_saves.store(reject, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn load_snapshot(&self) -> Result<Option<Snapshot>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("metadata store unreachable".to_string()));
        }
        Ok(self.snapshot.lock().clone())
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) || self.reject_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("metadata store rejected write".to_string()));
        }
        *self.snapshot.lock() = Some(snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
