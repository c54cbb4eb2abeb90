//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use agentchat_media::{AssetCache, HttpFetcher, SavedAsset};
use agentchat_shared::{MessageRecord, Sender};
use agentchat_store::{Database, MessageLog, RecordStore};
use anyhow::{bail, Context};
use tracing::info;

use crate::config::AppConfig;
use crate::MessagesCommand;

async fn build_cache(config: &AppConfig) -> anyhow::Result<AssetCache> {
    let fetcher = HttpFetcher::new(config.fetch_timeout)?;
    let cache = AssetCache::new(config.asset_cache()?, Arc::new(fetcher)).await?;
    Ok(cache)
}

fn open_store(config: &AppConfig) -> anyhow::Result<RecordStore<Database>> {
    let path = config.database_path()?;
    let db = Database::open_at(&path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    Ok(RecordStore::new(db))
}

fn load_seed(path: Option<&Path>) -> anyhow::Result<Vec<MessageRecord>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let records = serde_json::from_slice(&data)
        .with_context(|| format!("Seed file {} is not a message list", path.display()))?;
    Ok(records)
}

pub async fn fetch(config: &AppConfig, key: &str) -> anyhow::Result<()> {
    let cache = build_cache(config).await?;

    let Some(entry) = cache.resolve_entry(key).await else {
        bail!("Could not load image from {key}");
    };

    println!(
        "{key}: {}x{} ({:?})",
        entry.image.width(),
        entry.image.height(),
        entry.origin
    );
    Ok(())
}

pub async fn save(config: &AppConfig, file: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let cache = build_cache(config).await?;
    let Some(saved) = cache.save_bytes_locally(bytes, name).await else {
        bail!("Failed to save image {}", file.display());
    };

    print_saved(&saved);
    Ok(())
}

pub async fn messages(
    config: &AppConfig,
    seed: Option<&Path>,
    action: MessagesCommand,
) -> anyhow::Result<()> {
    let store = open_store(config)?;

    match action {
        MessagesCommand::Status => {
            match store.try_load() {
                Ok(Some(records)) => println!("transcript: {} messages", records.len()),
                Ok(None) => println!("transcript: none"),
                Err(e) => println!("transcript: present but unreadable ({e})"),
            }
            println!("seeded: {}", store.has_seeded());
        }
        MessagesCommand::Clear => {
            store.clear()?;
            info!("Transcript cleared");
        }
        MessagesCommand::List => {
            let seed_records = load_seed(seed)?;
            let log = MessageLog::open(store, move || seed_records);
            for record in log.records() {
                println!("{}", format_record(record));
            }
        }
        MessagesCommand::Send { text, agent } => {
            let text = text.trim();
            if text.is_empty() {
                bail!("Refusing to send an empty message");
            }
            let seed_records = load_seed(seed)?;
            let mut log = MessageLog::open(store, move || seed_records);

            let sender = if agent { Sender::Agent } else { Sender::User };
            let record = MessageRecord::text(text, sender);
            println!("{}", format_record(&record));
            log.append(record)?;
        }
        MessagesCommand::Attach { file, caption } => {
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let cache = build_cache(config).await?;
            let Some(saved) = cache.save_bytes_locally(bytes, None).await else {
                bail!("Failed to save image {}", file.display());
            };

            let seed_records = load_seed(seed)?;
            let mut log = MessageLog::open(store, move || seed_records);
            let record = MessageRecord::file(
                caption,
                saved.path,
                saved.byte_size,
                saved.thumbnail_path,
                Sender::User,
            );
            println!("{}", format_record(&record));
            log.append(record)?;
        }
    }

    Ok(())
}

fn print_saved(saved: &SavedAsset) {
    println!("path: {}", saved.path);
    println!("size: {} bytes", saved.byte_size);
    match &saved.thumbnail_path {
        Some(thumb) => println!("thumbnail: {thumb}"),
        None => println!("thumbnail: none"),
    }
}

/// One transcript line: `[time] sender: text [attachment]`.
fn format_record(record: &MessageRecord) -> String {
    let when = record
        .timestamp()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| record.timestamp_millis.to_string());
    let who = if record.is_from_user() { "user" } else { "agent" };

    let mut line = format!("[{when}] {who}: {}", record.text);
    if let Some(file) = &record.file {
        if !record.text.is_empty() {
            line.push(' ');
        }
        line.push_str(&format!("<{} {}>", file.path, file.formatted_size()));
    }
    line
}
