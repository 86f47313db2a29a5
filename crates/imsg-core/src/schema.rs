//! Schema capability probe.
//!
//! The Messages schema has gained optional columns across macOS releases.
//! Rather than string-checking column names at every call site, the probe
//! runs once per connection and produces an immutable record of typed flags
//! that all downstream query construction branches on.

use std::collections::HashSet;

use serde::Serialize;

/// Optional-schema capability flags for one connected database.
///
/// Each flag is derived purely from column presence on the `message` and
/// `attachment` tables, never from row content. Absent columns yield `false`;
/// probing never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// `message.attributedBody` exists (rich-text blob alongside `text`).
    pub has_attributed_body: bool,
    /// Both `message.associated_message_guid` and
    /// `message.associated_message_type` exist (tapback event columns).
    pub has_tapback_columns: bool,
    /// `message.thread_originator_guid` exists (reply threads).
    pub has_thread_origin: bool,
    /// `message.destination_caller_id` exists.
    pub has_caller_id: bool,
    /// `message.is_audio_message` exists.
    pub has_audio_flag: bool,
    /// `attachment.user_info` exists (attachment metadata blob).
    pub has_attachment_user_info: bool,
}

impl Capabilities {
    /// Probe capabilities from the column names of the `message` and
    /// `attachment` tables.
    ///
    /// Pure function of its inputs; the caller supplies the column sets
    /// (typically via `PRAGMA table_info`).
    #[must_use]
    pub fn probe(
        message_columns: &HashSet<String>,
        attachment_columns: &HashSet<String>,
    ) -> Self {
        Self {
            has_attributed_body: message_columns.contains("attributedBody"),
            has_tapback_columns: message_columns.contains("associated_message_guid")
                && message_columns.contains("associated_message_type"),
            has_thread_origin: message_columns.contains("thread_originator_guid"),
            has_caller_id: message_columns.contains("destination_caller_id"),
            has_audio_flag: message_columns.contains("is_audio_message"),
            has_attachment_user_info: attachment_columns.contains("user_info"),
        }
    }
}
