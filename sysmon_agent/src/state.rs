//! Shared agent state: the latest published snapshot.
//!
//! The collector is the only writer; HTTP handlers are readers. A publish
//! swaps an `Arc` under the write lock, a read clones it under the read lock,
//! so neither side holds the lock while doing real work and a reader sees
//! either the old record or the new one, never a mix.

use std::sync::{Arc, RwLock};

use crate::types::MetricRecord;

#[derive(Clone, Default)]
pub struct SnapshotStore {
    latest: Arc<RwLock<Option<Arc<MetricRecord>>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot wholesale and hand back the shared copy.
    pub fn publish(&self, record: MetricRecord) -> Arc<MetricRecord> {
        let record = Arc::new(record);
        // A poisoned lock still guards a whole `Option<Arc<_>>`, so recover it.
        let mut slot = self.latest.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(record.clone());
        record
    }

    /// `None` until the first publish.
    pub fn read(&self) -> Option<Arc<MetricRecord>> {
        self.latest
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
