//! imsg - read-only Messages database reader with tapback resolution

mod cli;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::commands::{run_doctor, run_messages, run_tapbacks};
use cli::{Cli, Commands};
use output::Formatter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db)?;
    let format = Formatter::new(cli.format);

    match cli.command {
        Commands::Doctor => run_doctor(&db_path, format),
        Commands::Messages { limit } => run_messages(&db_path, limit, format),
        Commands::Tapbacks { message_rowid } => run_tapbacks(&db_path, message_rowid, format),
    }
}

/// The `--db` override, or the OS default location.
fn resolve_db_path(db: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = db {
        return Ok(path);
    }
    let home = dirs::home_dir().context("Cannot determine home directory; pass --db")?;
    Ok(home.join("Library/Messages/chat.db"))
}
