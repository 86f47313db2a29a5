//! Query layer over the Messages database.
//!
//! SQL projections are built from the probed [`Capabilities`] so the same
//! queries run against databases missing optional columns. Tapback event
//! rows are streamed in `(date, ROWID)` order and folded by the resolver.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::Serialize;
use tracing::debug;

use super::{apple_time_to_utc, MessageDb};
use crate::error::{CoreError, CoreResult};
use crate::tapback::{correlates_with, resolve_tapbacks, Tapback, TapbackRow};
use crate::typedstream;

/// A chat message for list views.
///
/// Fields backed by optional columns are `None`/`false` when the connected
/// database predates them.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub rowid: i64,
    pub guid: String,
    pub text: Option<String>,
    pub sender: String,
    pub is_from_me: bool,
    pub date: DateTime<Utc>,
    pub chat: Option<String>,
    pub thread_originator_guid: Option<String>,
    pub is_audio: bool,
}

impl MessageDb {
    /// Resolve the current live tapback set for one message.
    ///
    /// Streams the correlated event rows ascending by `(date, ROWID)` and
    /// folds them. Databases without tapback columns yield an empty set.
    pub fn tapbacks_for_message(&self, message_rowid: i64) -> CoreResult<Vec<Tapback>> {
        let guid: Option<String> = self
            .conn
            .query_row(
                "SELECT guid FROM message WHERE ROWID = ?1",
                [message_rowid],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up target message")?;

        let Some(guid) = guid else {
            return Err(CoreError::MessageNotFound {
                rowid: message_rowid,
            });
        };
        if guid.is_empty() {
            // Nothing can correlate to a message without a GUID.
            debug!(message_rowid, "target message has no guid");
            return Ok(Vec::new());
        }
        if !self.caps.has_tapback_columns {
            debug!("schema predates tapbacks");
            return Ok(Vec::new());
        }

        let rows = self
            .tapback_rows(&guid, message_rowid)
            .map_err(CoreError::Internal)?;
        Ok(resolve_tapbacks(&rows))
    }

    /// Fetch the raw tapback event rows targeting `guid`, in fold order.
    fn tapback_rows(&self, guid: &str, message_rowid: i64) -> Result<Vec<TapbackRow>> {
        let mut sql = String::from(
            "SELECT m.ROWID, m.associated_message_type, m.associated_message_guid,
                    COALESCE(h.id, ''), COALESCE(m.is_from_me, 0), COALESCE(m.date, 0),
                    m.text",
        );
        if self.caps.has_attributed_body {
            sql.push_str(", m.attributedBody");
        }
        sql.push_str(
            " FROM message m
              LEFT JOIN handle h ON m.handle_id = h.ROWID
              WHERE m.associated_message_type BETWEEN 2000 AND 3006
                AND (m.associated_message_guid = ?1
                     OR m.associated_message_guid LIKE '%/' || ?1)
              ORDER BY m.date ASC, m.ROWID ASC",
        );

        let has_body = self.caps.has_attributed_body;
        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare tapback query")?;
        let mapped = stmt
            .query_map([guid], |row| {
                let text: Option<String> = row.get(6)?;
                let body: Option<Vec<u8>> = if has_body { row.get(7)? } else { None };
                Ok(RawEventRow {
                    rowid: row.get(0)?,
                    code: row.get(1)?,
                    associated_guid: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    sender: row.get(3)?,
                    is_from_me: row.get::<_, i64>(4)? != 0,
                    date_raw: row.get(5)?,
                    text,
                    body,
                })
            })
            .context("Failed to query tapback rows")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read tapback rows")?;

        let rows = mapped
            .into_iter()
            .filter(|raw| correlates_with(&raw.associated_guid, guid))
            .map(|raw| raw.into_tapback_row(message_rowid))
            .collect();
        Ok(rows)
    }

    /// List recent messages, newest first, excluding tapback event rows.
    pub fn list_messages(&self, limit: i64) -> CoreResult<Vec<Message>> {
        self.list_messages_inner(limit).map_err(CoreError::Internal)
    }

    fn list_messages_inner(&self, limit: i64) -> Result<Vec<Message>> {
        let caps = self.caps;
        let mut sql = String::from(
            "SELECT m.ROWID, m.guid, m.text, COALESCE(h.id, ''),
                    COALESCE(m.is_from_me, 0), COALESCE(m.date, 0), c.chat_identifier",
        );
        if caps.has_attributed_body {
            sql.push_str(", m.attributedBody");
        }
        if caps.has_thread_origin {
            sql.push_str(", m.thread_originator_guid");
        }
        if caps.has_audio_flag {
            sql.push_str(", COALESCE(m.is_audio_message, 0)");
        }
        sql.push_str(
            " FROM message m
              LEFT JOIN handle h ON m.handle_id = h.ROWID
              LEFT JOIN chat_message_join cmj ON cmj.message_id = m.ROWID
              LEFT JOIN chat c ON c.ROWID = cmj.chat_id",
        );
        if caps.has_tapback_columns {
            // Event rows are bookkeeping, not conversation.
            sql.push_str(
                " WHERE COALESCE(m.associated_message_type, 0) NOT BETWEEN 2000 AND 3006",
            );
        }
        sql.push_str(" ORDER BY m.date DESC, m.ROWID DESC LIMIT ?1");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare message list query")?;
        let messages = stmt
            .query_map([limit], |row| {
                let mut col = 7;
                let mut next = || {
                    let c = col;
                    col += 1;
                    c
                };

                let text: Option<String> = row.get(2)?;
                let body: Option<Vec<u8>> = if caps.has_attributed_body {
                    row.get(next())?
                } else {
                    None
                };
                let thread_originator_guid: Option<String> = if caps.has_thread_origin {
                    row.get(next())?
                } else {
                    None
                };
                let is_audio = if caps.has_audio_flag {
                    row.get::<_, i64>(next())? != 0
                } else {
                    false
                };

                Ok(Message {
                    rowid: row.get(0)?,
                    guid: row.get(1)?,
                    text: resolve_text(text, body.as_deref()),
                    sender: row.get(3)?,
                    is_from_me: row.get::<_, i64>(4)? != 0,
                    date: apple_time_to_utc(row.get(5)?),
                    chat: row.get(6)?,
                    thread_originator_guid,
                    is_audio,
                })
            })
            .context("Failed to query messages")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to read messages")?;
        Ok(messages)
    }
}

/// Pre-classification event row as it comes off the wire.
struct RawEventRow {
    rowid: i64,
    code: i64,
    associated_guid: String,
    sender: String,
    is_from_me: bool,
    date_raw: i64,
    text: Option<String>,
    body: Option<Vec<u8>>,
}

impl RawEventRow {
    fn into_tapback_row(self, message_rowid: i64) -> TapbackRow {
        let text = resolve_text(self.text, self.body.as_deref()).unwrap_or_default();
        TapbackRow {
            rowid: self.rowid,
            code: self.code,
            sender: self.sender,
            is_from_me: self.is_from_me,
            date: apple_time_to_utc(self.date_raw),
            text,
            message_rowid,
        }
    }
}

/// Resolve a row's text: the plain column when non-empty, otherwise the
/// attributed-body extraction, otherwise nothing.
fn resolve_text(text: Option<String>, body: Option<&[u8]>) -> Option<String> {
    match text {
        Some(t) if !t.is_empty() => Some(t),
        _ => body.and_then(typedstream::extract_text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{open_with_schema, ANCIENT_SCHEMA, MODERN_SCHEMA};
    use crate::tapback::TapbackType;
    use rusqlite::params;

    const TARGET_GUID: &str = "6F9619FF-8B86-D011-B42D-00CF4FC964FF";

    fn insert_target(db: &MessageDb) {
        db.conn()
            .execute(
                "INSERT INTO message (ROWID, guid, text, handle_id, date, is_from_me)
                 VALUES (1, ?1, 'hello', 1, 100, 0)",
                params![TARGET_GUID],
            )
            .expect("insert target");
        db.conn()
            .execute("INSERT INTO handle (ROWID, id) VALUES (1, '+15550100')", [])
            .expect("insert handle");
        db.conn()
            .execute("INSERT INTO handle (ROWID, id) VALUES (2, '+15550101')", [])
            .expect("insert handle");
    }

    fn insert_event(
        db: &MessageDb,
        rowid: i64,
        code: i64,
        handle_id: i64,
        date: i64,
        text: Option<&str>,
        associated_guid: &str,
    ) {
        db.conn()
            .execute(
                "INSERT INTO message
                     (ROWID, guid, text, handle_id, date, is_from_me,
                      associated_message_guid, associated_message_type)
                 VALUES (?1, 'evt-' || ?1, ?2, ?3, ?4, 0, ?5, ?6)",
                params![rowid, text, handle_id, date, associated_guid, code],
            )
            .expect("insert event");
    }

    #[test]
    fn test_missing_message_is_typed_error() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        let err = db.tapbacks_for_message(999).err().expect("should fail");
        assert!(matches!(err, CoreError::MessageNotFound { rowid: 999 }));
    }

    #[test]
    fn test_no_events_yields_empty_set() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        assert!(db.tapbacks_for_message(1).expect("resolve").is_empty());
    }

    #[test]
    fn test_add_then_remove_round_trip() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        insert_event(&db, 10, 2000, 1, 200, None, TARGET_GUID);
        insert_event(&db, 11, 3000, 1, 300, None, TARGET_GUID);
        assert!(db.tapbacks_for_message(1).expect("resolve").is_empty());
    }

    #[test]
    fn test_part_prefixed_guid_correlates() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        insert_event(&db, 10, 2001, 1, 200, None, &format!("p:0/{TARGET_GUID}"));
        let live = db.tapbacks_for_message(1).expect("resolve");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind, TapbackType::Liked);
        assert_eq!(live[0].sender, "+15550100");
    }

    #[test]
    fn test_unrelated_guid_does_not_correlate() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        insert_event(&db, 10, 2001, 1, 200, None, "some-other-guid");
        assert!(db.tapbacks_for_message(1).expect("resolve").is_empty());
    }

    #[test]
    fn test_two_senders_coexist_and_supersede_independently() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        insert_event(&db, 10, 2000, 1, 200, None, TARGET_GUID);
        insert_event(&db, 11, 2000, 2, 300, None, TARGET_GUID);
        insert_event(&db, 12, 3000, 1, 400, None, TARGET_GUID);
        let live = db.tapbacks_for_message(1).expect("resolve");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].sender, "+15550101");
    }

    #[test]
    fn test_custom_emoji_from_attributed_body() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        // Text column empty; summary lives only in the attributedBody blob.
        let mut blob = b"junk NSString more".to_vec();
        let payload = "Reacted \u{1F389} to \u{201C}hello\u{201D}".as_bytes();
        blob.extend_from_slice(&[0x01, 0x2B]);
        blob.push(u8::try_from(payload.len()).expect("short payload"));
        blob.extend_from_slice(payload);
        db.conn()
            .execute(
                "INSERT INTO message
                     (ROWID, guid, text, attributedBody, handle_id, date, is_from_me,
                      associated_message_guid, associated_message_type)
                 VALUES (20, 'evt-20', NULL, ?1, 1, 500, 0, ?2, 2006)",
                params![blob, TARGET_GUID],
            )
            .expect("insert event");
        let live = db.tapbacks_for_message(1).expect("resolve");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind, TapbackType::Custom("\u{1F389}".to_string()));
    }

    #[test]
    fn test_events_fold_in_date_order_not_rowid_order() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        // Inserted out of date order; the query's ORDER BY restores it.
        insert_event(&db, 11, 3001, 1, 300, None, TARGET_GUID);
        insert_event(&db, 10, 2001, 1, 200, None, TARGET_GUID);
        assert!(db.tapbacks_for_message(1).expect("resolve").is_empty());
    }

    #[test]
    fn test_ancient_schema_yields_empty_set() {
        let db = open_with_schema(ANCIENT_SCHEMA).expect("open");
        db.conn()
            .execute(
                "INSERT INTO message (ROWID, guid, text, handle_id, date, is_from_me)
                 VALUES (1, ?1, 'hello', 0, 100, 0)",
                params![TARGET_GUID],
            )
            .expect("insert target");
        assert!(db.tapbacks_for_message(1).expect("resolve").is_empty());
    }

    #[test]
    fn test_list_messages_excludes_event_rows() {
        let db = open_with_schema(MODERN_SCHEMA).expect("open");
        insert_target(&db);
        insert_event(&db, 10, 2000, 1, 200, None, TARGET_GUID);
        let messages = db.list_messages(10).expect("list");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].guid, TARGET_GUID);
        assert_eq!(messages[0].text.as_deref(), Some("hello"));
        assert_eq!(messages[0].sender, "+15550100");
    }

    #[test]
    fn test_list_messages_on_ancient_schema() {
        let db = open_with_schema(ANCIENT_SCHEMA).expect("open");
        db.conn()
            .execute(
                "INSERT INTO message (ROWID, guid, text, handle_id, date, is_from_me)
                 VALUES (1, 'g-1', 'old message', 0, 100, 1)",
                [],
            )
            .expect("insert");
        let messages = db.list_messages(10).expect("list");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].is_from_me);
        assert_eq!(messages[0].thread_originator_guid, None);
        assert!(!messages[0].is_audio);
    }
}
