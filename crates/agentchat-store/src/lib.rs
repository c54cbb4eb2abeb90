//! # agentchat-store
//!
//! Durable persistence of the chat transcript.
//!
//! The crate stores the whole message collection as a single JSON blob under
//! a well-known key of a flat key-value substrate, next to a one-shot
//! "seed data loaded" flag. [`Database`] provides that substrate on top of
//! SQLite; [`MemoryStore`] is an in-process stand-in. [`RecordStore`] owns
//! the key layout and [`MessageLog`] keeps an in-memory, sorted copy of the
//! transcript that is written through on every change.

pub mod database;
pub mod kv;
pub mod log;
pub mod migrations;
pub mod records;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use kv::{KeyValueStore, MemoryStore};
pub use log::MessageLog;
pub use records::RecordStore;
