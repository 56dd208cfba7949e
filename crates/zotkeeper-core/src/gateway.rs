use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{GatewayError, Result};
use crate::models::{ItemType, Record, RecordKey, RecordPatch};

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Empty means all item types.
    pub item_types: Vec<ItemType>,
    pub tag: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        if !self.item_types.is_empty() && !self.item_types.contains(&record.item_type) {
            return false;
        }
        match &self.tag {
            Some(tag) => record.tags.contains(tag),
            None => true,
        }
    }
}

/// The remote reference library's read/write API.
///
/// Every write supplies the version observed at read time; a stale version
/// is a `VersionConflict`, never a silent overwrite.
#[async_trait]
pub trait LibraryGateway: Send + Sync {
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<Record>>;
    async fn get(&self, key: &RecordKey) -> Result<Record>;
    async fn update(&self, record: &Record, expected_version: u64) -> Result<Record>;
    async fn create(&self, records: &[Record]) -> Result<Vec<Record>>;
    async fn delete(&self, key: &RecordKey) -> Result<()>;
}

/// What a write-capable operation did with one computed patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing to change.
    Unchanged,
    /// Dry run: the patch was computed and reported, no gateway call made.
    Previewed,
    /// The patch was committed; the library assigned a new version.
    Applied { new_version: u64 },
}

/// The single apply-or-preview wrapper every write-capable operation goes
/// through. Dry-run mode must never reach the gateway.
pub async fn commit_patch(
    gateway: &dyn LibraryGateway,
    record: &Record,
    patch: &RecordPatch,
    dry_run: bool,
) -> Result<WriteOutcome> {
    if patch.is_empty() {
        return Ok(WriteOutcome::Unchanged);
    }
    if dry_run {
        return Ok(WriteOutcome::Previewed);
    }

    let mut updated = record.clone();
    patch.apply_to(&mut updated);
    let written = gateway.update(&updated, record.version).await?;
    Ok(WriteOutcome::Applied {
        new_version: written.version,
    })
}

/// In-memory gateway with real version semantics, for tests and offline
/// experiments. The atomic counters let tests assert that dry runs issue
/// zero writes.
#[derive(Default)]
pub struct MemoryGateway {
    records: Mutex<BTreeMap<RecordKey, Record>>,
    update_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(records: impl IntoIterator<Item = Record>) -> Self {
        let gateway = Self::new();
        {
            let mut store = gateway.records.lock().await;
            for record in records {
                store.insert(record.key.clone(), record);
            }
        }
        gateway
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.update_calls() + self.create_calls() + self.delete_calls()
    }
}

#[async_trait]
impl LibraryGateway for MemoryGateway {
    async fn list(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        let store = self.records.lock().await;
        Ok(store
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &RecordKey) -> Result<Record> {
        let store = self.records.lock().await;
        store
            .get(key)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(key.clone()))
    }

    async fn update(&self, record: &Record, expected_version: u64) -> Result<Record> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        let mut store = self.records.lock().await;
        let current = store
            .get(&record.key)
            .ok_or_else(|| GatewayError::NotFound(record.key.clone()))?;

        if current.version != expected_version {
            return Err(GatewayError::VersionConflict {
                key: record.key.clone(),
                expected: expected_version,
                found: current.version,
            });
        }

        let mut written = record.clone();
        written.version = expected_version + 1;
        store.insert(written.key.clone(), written.clone());
        Ok(written)
    }

    async fn create(&self, records: &[Record]) -> Result<Vec<Record>> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let mut store = self.records.lock().await;
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            if store.contains_key(&record.key) {
                return Err(GatewayError::InvalidRecord(format!(
                    "key already exists: {}",
                    record.key
                )));
            }
            let mut written = record.clone();
            written.version = 1;
            store.insert(written.key.clone(), written.clone());
            created.push(written);
        }
        Ok(created)
    }

    async fn delete(&self, key: &RecordKey) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut store = self.records.lock().await;
        store
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(key.clone()))
    }
}
