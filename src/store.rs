//! Observable AOI record store.
//!
//! DESIGN
//! ======
//! `RecordStore` is the single source of truth for which AOIs exist. It wraps
//! a `tokio::sync::watch` channel holding the whole ordered collection: every
//! mutation replaces or edits the value in one step and then signals
//! subscribers, so a subscriber never sees a half-applied change. The layer
//! synchronizer subscribes to this signal instead of being called from each
//! mutation site.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::doc::{AoiId, AoiList, AoiRecord};

/// Cloneable handle to the shared record collection.
#[derive(Clone)]
pub struct RecordStore {
    tx: Arc<watch::Sender<AoiList>>,
}

impl RecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AoiList::new());
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to change notifications. The receiver starts out with the
    /// current contents marked as seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AoiList> {
        self.tx.subscribe()
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> AoiList {
        self.tx.borrow().clone()
    }

    /// Look up a record by identity.
    #[must_use]
    pub fn get(&self, id: &AoiId) -> Option<AoiRecord> {
        self.tx.borrow().get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &AoiId) -> bool {
        self.tx.borrow().contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Append a confirmed record (replacing any record with the same identity).
    pub fn append(&self, record: AoiRecord) {
        let id = record.id.clone();
        self.tx.send_modify(|list| {
            list.upsert(record);
        });
        debug!(%id, "record appended");
    }

    /// Remove the record with this identity. Subscribers are only notified
    /// when something was removed.
    pub fn remove(&self, id: &AoiId) -> Option<AoiRecord> {
        let mut removed = None;
        self.tx.send_if_modified(|list| {
            removed = list.remove(id);
            removed.is_some()
        });
        debug!(%id, removed = removed.is_some(), "record remove");
        removed
    }

    /// Replace the entire contents.
    pub fn replace_all(&self, records: Vec<AoiRecord>) {
        let count = records.len();
        self.tx.send_modify(|list| list.replace_all(records));
        debug!(count, "records replaced");
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}
