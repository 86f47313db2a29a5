//! Command handlers for the imsg CLI.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use imsg_core::db::MessageDb;
use imsg_core::Capabilities;

use crate::output::Formatter;

/// Doctor report: where we looked and what the schema supports.
#[derive(Debug, Serialize)]
struct DoctorReport {
    path: String,
    message_count: i64,
    capabilities: Capabilities,
}

/// Report schema capabilities and basic stats.
#[tracing::instrument(skip(format))]
pub fn run_doctor(db_path: &Path, format: Formatter) -> Result<()> {
    let db = MessageDb::open(db_path)?;
    let report = DoctorReport {
        path: db_path.display().to_string(),
        message_count: db.message_count()?,
        capabilities: *db.capabilities(),
    };
    format.print(&report)
}

/// List recent messages, newest first.
#[tracing::instrument(skip(format))]
pub fn run_messages(db_path: &Path, limit: i64, format: Formatter) -> Result<()> {
    let db = MessageDb::open(db_path)?;
    let messages = db.list_messages(limit)?;
    format.print_list(&messages, "No messages.")
}

/// Resolve and show the live tapbacks on one message.
#[tracing::instrument(skip(format))]
pub fn run_tapbacks(db_path: &Path, message_rowid: i64, format: Formatter) -> Result<()> {
    let db = MessageDb::open(db_path)?;
    let tapbacks = db.tapbacks_for_message(message_rowid)?;
    format.print_list(&tapbacks, "No tapbacks.")
}
