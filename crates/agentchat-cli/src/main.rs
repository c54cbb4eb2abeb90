//! # agentchat
//!
//! Command-line front end for the chat client's storage layer.
//!
//! This binary is the composition root: it reads configuration, sets up
//! logging, builds the [`AssetCache`] and the transcript store, and hands
//! them to the requested subcommand.
//!
//! [`AssetCache`]: agentchat_media::AssetCache

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "agentchat", version, about = "Image cache and transcript store tools")]
struct Cli {
    /// JSON file with the records to load the first time the transcript is opened
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve an image URL or path through the cache
    Fetch { key: String },

    /// Compress an image into the cache directory, with a thumbnail
    Save {
        file: PathBuf,
        /// Base name for the saved files (default: a random UUID)
        #[arg(long)]
        name: Option<String>,
    },

    /// Inspect or modify the stored transcript
    Messages {
        #[command(subcommand)]
        action: MessagesCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    /// Print every message in timestamp order
    List,
    /// Show whether a transcript and the seed flag are stored
    Status,
    /// Remove the transcript and the seed flag
    Clear,
    /// Append a text message
    Send {
        text: String,
        /// Record the message as coming from the agent
        #[arg(long)]
        agent: bool,
    },
    /// Save an image through the cache and append it as a file message
    Attach {
        file: PathBuf,
        #[arg(long, default_value = "")]
        caption: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable. Respects RUST_LOG.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,agentchat=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    debug!(?config, "Loaded configuration");

    match cli.command {
        Command::Fetch { key } => commands::fetch(&config, &key).await,
        Command::Save { file, name } => commands::save(&config, &file, name.as_deref()).await,
        Command::Messages { action } => {
            commands::messages(&config, cli.seed.as_deref(), action).await
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_messages_send() {
        let cli = Cli::try_parse_from(["agentchat", "messages", "send", "hello", "--agent"]).unwrap();
        match cli.command {
            Command::Messages {
                action: MessagesCommand::Send { text, agent },
            } => {
                assert_eq!(text, "hello");
                assert!(agent);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_seed_is_global() {
        let cli =
            Cli::try_parse_from(["agentchat", "messages", "list", "--seed", "seed.json"]).unwrap();
        assert_eq!(cli.seed, Some(PathBuf::from("seed.json")));
    }
}
