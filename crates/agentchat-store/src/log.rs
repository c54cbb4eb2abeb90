//! In-memory transcript with write-through persistence.
//!
//! The in-memory list is the source of truth. Every change is followed by a
//! full save; a failed save is reported but never drops the change.

use agentchat_shared::MessageRecord;
use tracing::{info, warn};

use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::records::RecordStore;

pub struct MessageLog<S> {
    store: RecordStore<S>,
    records: Vec<MessageRecord>,
}

impl<S: KeyValueStore> MessageLog<S> {
    /// Load the persisted transcript.
    ///
    /// When nothing is stored and seed data has never been loaded, `seed`
    /// provides the initial records; they are saved and the seed flag is set.
    pub fn open<F>(store: RecordStore<S>, seed: F) -> Self
    where
        F: FnOnce() -> Vec<MessageRecord>,
    {
        let mut records = store.load();

        if records.is_empty() && !store.has_seeded() {
            records = seed();
            agentchat_shared::sort_by_timestamp(&mut records);

            match store.save(&records) {
                Ok(()) => {
                    if let Err(e) = store.mark_seeded() {
                        warn!(error = %e, "failed to set seed flag");
                    }
                    info!(count = records.len(), "seed messages loaded");
                }
                Err(e) => warn!(error = %e, "seed messages kept in memory only"),
            }
        }

        Self { store, records }
    }

    /// Messages in ascending timestamp order.
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    /// Insert `record` in timestamp order and persist the whole list.
    ///
    /// The record is kept in memory even if persisting fails.
    pub fn append(&mut self, record: MessageRecord) -> Result<()> {
        // after any record with an equal timestamp, so ties keep arrival order
        let at = self
            .records
            .partition_point(|r| r.timestamp_millis <= record.timestamp_millis);
        self.records.insert(at, record);
        self.store.save(&self.records)
    }

    /// Re-read the transcript from the store.
    pub fn refresh(&mut self) {
        self.records = self.store.load();
    }

    /// Clear the store (including the seed flag) and the in-memory list.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        self.records.clear();
        Ok(())
    }
}
