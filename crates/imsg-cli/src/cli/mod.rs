//! CLI command definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

pub mod commands;

/// Read-only Messages database reader with tapback resolution
#[derive(Parser, Debug)]
#[command(name = "imsg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to chat.db (default: ~/Library/Messages/chat.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report schema capabilities and basic stats for the database
    Doctor,

    /// List recent messages, newest first
    Messages {
        /// Maximum number of messages to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },

    /// Show the current live tapbacks on a message
    Tapbacks {
        /// ROWID of the target message
        message_rowid: i64,
    },
}
