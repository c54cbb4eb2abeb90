//! # agentchat-shared
//!
//! Types shared by the asset cache and the record store: the persisted
//! [`MessageRecord`] shape, the asset key classifier and a handful of
//! constants both sides agree on.

pub mod constants;
pub mod locator;
pub mod message;

pub use locator::{Locator, Scheme};
pub use message::{sort_by_timestamp, FileAttachment, MessageKind, MessageRecord, Sender, Thumbnail};
