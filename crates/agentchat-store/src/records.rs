//! Whole-collection persistence of the message list.
//!
//! The full, ordered list is serialized as JSON and written under
//! [`MESSAGES_KEY`]; every save replaces the previous value wholesale. A
//! separate [`SEEDED_KEY`] holds the one-way "seed data loaded" flag.

use agentchat_shared::constants::{MESSAGES_KEY, SEEDED_KEY};
use agentchat_shared::{sort_by_timestamp, MessageRecord};
use tracing::{debug, warn};

use crate::error::Result;
use crate::kv::KeyValueStore;

const SEEDED_VALUE: &[u8] = b"true";

/// Message persistence over a [`KeyValueStore`].
#[derive(Debug)]
pub struct RecordStore<S> {
    kv: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// The underlying substrate.
    pub fn substrate(&self) -> &S {
        &self.kv
    }

    /// Serialize `records` and replace the stored collection with them.
    ///
    /// On failure the previously stored value is left untouched and the
    /// caller still owns `records`.
    pub fn save(&self, records: &[MessageRecord]) -> Result<()> {
        let blob = serde_json::to_vec(records).map_err(|e| {
            warn!(error = %e, "failed to encode messages");
            e
        })?;

        self.kv.set(MESSAGES_KEY, &blob).map_err(|e| {
            warn!(error = %e, "failed to save messages");
            e
        })?;

        debug!(count = records.len(), bytes = blob.len(), "messages saved");
        Ok(())
    }

    /// Load the stored collection sorted ascending by timestamp.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet and an error when
    /// a value is present but cannot be read or decoded.
    pub fn try_load(&self) -> Result<Option<Vec<MessageRecord>>> {
        let Some(blob) = self.kv.get(MESSAGES_KEY)? else {
            return Ok(None);
        };

        let mut records: Vec<MessageRecord> = serde_json::from_slice(&blob)?;
        sort_by_timestamp(&mut records);
        Ok(Some(records))
    }

    /// Load the stored collection sorted ascending by timestamp.
    ///
    /// Absent data and unreadable data both yield an empty list; the latter
    /// is logged.
    pub fn load(&self) -> Vec<MessageRecord> {
        match self.try_load() {
            Ok(Some(records)) => records,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to load messages, starting empty");
                Vec::new()
            }
        }
    }

    /// Remove both the stored collection and the seed flag.
    pub fn clear(&self) -> Result<()> {
        self.kv.remove_all(&[MESSAGES_KEY, SEEDED_KEY])?;
        debug!("message store cleared");
        Ok(())
    }

    /// Whether a collection is stored, regardless of whether it decodes.
    pub fn has_existing(&self) -> bool {
        self.kv.contains(MESSAGES_KEY).unwrap_or_else(|e| {
            warn!(error = %e, "failed to query message store");
            false
        })
    }

    pub fn has_seeded(&self) -> bool {
        match self.kv.get(SEEDED_KEY) {
            Ok(Some(value)) => value == SEEDED_VALUE,
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to read seed flag");
                false
            }
        }
    }

    /// Record that seed data has been loaded. Stays set until [`clear`].
    ///
    /// [`clear`]: RecordStore::clear
    pub fn mark_seeded(&self) -> Result<()> {
        self.kv.set(SEEDED_KEY, SEEDED_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use agentchat_shared::Sender;

    use super::*;
    use crate::database::Database;
    use crate::kv::MemoryStore;

    fn record(text: &str, ts: i64) -> MessageRecord {
        let mut r = MessageRecord::text(text, Sender::User);
        r.timestamp_millis = ts;
        r
    }

    #[test]
    fn test_empty_state() {
        let store = RecordStore::new(MemoryStore::new());
        assert!(!store.has_existing());
        assert!(!store.has_seeded());
        assert!(store.load().is_empty());
        assert!(store.try_load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_sorted() {
        let store = RecordStore::new(MemoryStore::new());
        let m1 = record("first", 100);
        let m2 = record("second", 200);

        store.save(&[m2.clone(), m1.clone()]).unwrap();
        assert!(store.has_existing());
        assert_eq!(store.load(), vec![m1, m2]);
    }

    #[test]
    fn test_save_replaces_wholesale() {
        let store = RecordStore::new(MemoryStore::new());
        store.save(&[record("a", 1), record("b", 2)]).unwrap();
        store.save(&[record("c", 3)]).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].text, "c");
    }

    #[test]
    fn test_saving_empty_list_still_counts_as_existing() {
        let store = RecordStore::new(MemoryStore::new());
        store.save(&[]).unwrap();
        assert!(store.has_existing());
        assert_eq!(store.try_load().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn test_clear_resets_both_keys() {
        let store = RecordStore::new(MemoryStore::new());
        store.save(&[record("a", 1)]).unwrap();
        store.mark_seeded().unwrap();
        assert!(store.has_seeded());

        store.clear().unwrap();
        assert!(!store.has_existing());
        assert!(!store.has_seeded());

        // clearing an empty store is fine too
        store.clear().unwrap();
        assert!(!store.has_existing());
    }

    #[test]
    fn test_seed_flag_is_sticky() {
        let store = RecordStore::new(MemoryStore::new());
        store.mark_seeded().unwrap();
        store.mark_seeded().unwrap();
        store.save(&[record("a", 1)]).unwrap();
        assert!(store.has_seeded());
    }

    #[test]
    fn test_corrupt_blob_degrades_to_empty() {
        let store = RecordStore::new(MemoryStore::new());
        store.save(&[record("a", 1)]).unwrap();

        store
            .substrate()
            .set(MESSAGES_KEY, b"\x00\x01 definitely not json")
            .unwrap();

        assert!(store.has_existing());
        assert!(store.load().is_empty());
        assert!(store.try_load().is_err());
    }

    #[test]
    fn test_sqlite_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = RecordStore::new(Database::open_at(&path).unwrap());
            store.save(&[record("b", 20), record("a", 10)]).unwrap();
            store.mark_seeded().unwrap();
        }

        let store = RecordStore::new(Database::open_at(&path).unwrap());
        let texts: Vec<_> = store.load().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, ["a", "b"]);
        assert!(store.has_seeded());

        store.clear().unwrap();
        assert!(!store.has_existing());
        assert!(!store.has_seeded());
    }
}
