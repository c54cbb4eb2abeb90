//! Chat message records persisted by the record store.
//!
//! The JSON field names match what earlier builds of the app wrote to disk
//! (`message`, `type`, `fileSize`, `timestamp`), so an existing blob keeps
//! decoding after an upgrade.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// What a message carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
}

/// Who wrote a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

// ---------------------------------------------------------------------------
// Attachment
// ---------------------------------------------------------------------------

/// Reference to a thumbnail image on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Thumbnail {
    pub path: String,
}

/// A file attached to a message. Paths point into the asset cache directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileAttachment {
    /// Location of the primary asset.
    pub path: String,
    /// Size of the primary asset in bytes.
    #[serde(rename = "fileSize")]
    pub byte_size: u64,
    /// Optional thumbnail derived from the primary asset.
    #[serde(default)]
    pub thumbnail: Option<Thumbnail>,
}

impl FileAttachment {
    pub fn new(path: impl Into<String>, byte_size: u64, thumbnail_path: Option<String>) -> Self {
        Self {
            path: path.into(),
            byte_size,
            thumbnail: thumbnail_path.map(|path| Thumbnail { path }),
        }
    }

    pub fn thumbnail_path(&self) -> Option<&str> {
        self.thumbnail.as_ref().map(|t| t.path.as_str())
    }

    /// Human readable size using decimal units, never smaller than KB
    /// ("Zero KB", "512 KB", "2.3 MB", "1.25 GB").
    pub fn formatted_size(&self) -> String {
        format_byte_count(self.byte_size)
    }
}

fn format_byte_count(bytes: u64) -> String {
    const KB: f64 = 1_000.0;
    const MB: f64 = 1_000_000.0;
    const GB: f64 = 1_000_000_000.0;

    if bytes == 0 {
        return "Zero KB".to_string();
    }

    let value = bytes as f64;
    let kb = (value / KB).round().max(1.0);
    if kb < 1_000.0 {
        return format!("{kb:.0} KB");
    }
    let mb = format!("{:.1}", value / MB);
    if mb.parse::<f64>().is_ok_and(|mb| mb < 1_000.0) {
        return format!("{} MB", trim_zeros(mb));
    }
    format!("{} GB", trim_zeros(format!("{:.2}", value / GB)))
}

fn trim_zeros(s: String) -> String {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    /// Unique message identifier.
    pub id: String,
    /// Message body, or the caption of a file message.
    #[serde(rename = "message")]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Attachment, present for [`MessageKind::File`].
    #[serde(default)]
    pub file: Option<FileAttachment>,
    pub sender: Sender,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_millis: i64,
}

impl MessageRecord {
    /// New text message stamped with the current time.
    pub fn text(content: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: content.into(),
            kind: MessageKind::Text,
            file: None,
            sender,
            timestamp_millis: Utc::now().timestamp_millis(),
        }
    }

    /// New file message stamped with the current time.
    pub fn file(
        caption: impl Into<String>,
        path: impl Into<String>,
        byte_size: u64,
        thumbnail_path: Option<String>,
        sender: Sender,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: caption.into(),
            kind: MessageKind::File,
            file: Some(FileAttachment::new(path, byte_size, thumbnail_path)),
            sender,
            timestamp_millis: Utc::now().timestamp_millis(),
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == MessageKind::Text
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// The timestamp as a UTC date, `None` if out of chrono's range.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_millis).single()
    }
}

/// Sort records ascending by timestamp. The sort is stable, so records
/// sharing a timestamp keep their relative order.
pub fn sort_by_timestamp(records: &mut [MessageRecord]) {
    records.sort_by_key(|r| r.timestamp_millis);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_match_stored_format() {
        let json = r#"{
            "id": "msg-001",
            "message": "see attached",
            "type": "file",
            "file": { "path": "/c/a.jpg", "fileSize": 2048, "thumbnail": { "path": "/c/a_thumb.jpg" } },
            "sender": "agent",
            "timestamp": 1703520000000
        }"#;

        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "msg-001");
        assert_eq!(record.kind, MessageKind::File);
        assert_eq!(record.sender, Sender::Agent);
        assert_eq!(record.timestamp_millis, 1_703_520_000_000);
        let file = record.file.as_ref().unwrap();
        assert_eq!(file.byte_size, 2048);
        assert_eq!(file.thumbnail_path(), Some("/c/a_thumb.jpg"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["message"], "see attached");
        assert_eq!(value["type"], "file");
        assert_eq!(value["file"]["fileSize"], 2048);
    }

    #[test]
    fn test_text_message_without_file_field() {
        let json = r#"{"id":"m","message":"hi","type":"text","sender":"user","timestamp":1}"#;
        let record: MessageRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_text());
        assert!(record.is_from_user());
        assert!(record.file.is_none());
    }

    #[test]
    fn test_constructors() {
        let text = MessageRecord::text("hello", Sender::User);
        assert!(text.is_text());
        assert!(text.timestamp().is_some());

        let file = MessageRecord::file("", "/c/x.jpg", 10, None, Sender::User);
        assert_eq!(file.kind, MessageKind::File);
        assert_ne!(text.id, file.id);
        assert!(file.file.unwrap().thumbnail.is_none());
    }

    #[test]
    fn test_sort_is_stable_and_ascending() {
        let mut a = MessageRecord::text("a", Sender::User);
        let mut b = MessageRecord::text("b", Sender::Agent);
        let mut c = MessageRecord::text("c", Sender::User);
        a.timestamp_millis = 30;
        b.timestamp_millis = 10;
        c.timestamp_millis = 10;

        let mut records = vec![a, b, c];
        sort_by_timestamp(&mut records);
        let texts: Vec<_> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["b", "c", "a"]);
    }

    #[test]
    fn test_formatted_size() {
        assert_eq!(format_byte_count(0), "Zero KB");
        assert_eq!(format_byte_count(400), "1 KB");
        assert_eq!(format_byte_count(512_000), "512 KB");
        assert_eq!(format_byte_count(2_000_000), "2 MB");
        assert_eq!(format_byte_count(2_300_000), "2.3 MB");
        assert_eq!(format_byte_count(1_250_000_000), "1.25 GB");
        // values that round up to the next unit are shown in that unit
        assert_eq!(format_byte_count(999_499), "999 KB");
        assert_eq!(format_byte_count(999_500), "1 MB");
        assert_eq!(format_byte_count(999_949_999), "999.9 MB");
        assert_eq!(format_byte_count(999_999_999), "1 GB");
    }
}
