//! Tapback state resolver.
//!
//! Folds an ordered stream of raw event rows into the current live tapback
//! set for one target message. Later events supersede earlier ones for the
//! same (sender, kind) key, so rows MUST arrive in ascending
//! `(date, rowid)` order — the resolver folds in the order given and does
//! not detect violations. Every intermediate state is a valid snapshot, so
//! a caller driving the fold row-by-row may stop early at any boundary.

use std::collections::HashMap;

use crate::tapback::{Tapback, TapbackAction, TapbackRow, TapbackType};

/// Lookup key for one live tapback: who sent it, and which kind.
///
/// Resolver-internal; never persisted. `Custom` kinds key on the exact
/// emoji grapheme, so two different emoji from the same sender coexist.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TapbackKey {
    sender: String,
    is_from_me: bool,
    kind: TapbackType,
}

impl TapbackKey {
    fn new(row: &TapbackRow, kind: TapbackType) -> Self {
        Self {
            sender: row.sender.clone(),
            is_from_me: row.is_from_me,
            kind,
        }
    }
}

/// Resolve the live tapback set from rows ordered ascending by
/// `(date, rowid)`.
///
/// Unclassifiable rows and removals with no matching live tapback are
/// silently absorbed; the fold never fails. Relative order of surviving
/// tapbacks follows first-add order.
#[must_use]
pub fn resolve_tapbacks(rows: &[TapbackRow]) -> Vec<Tapback> {
    let mut live: Vec<Tapback> = Vec::new();
    let mut index: HashMap<TapbackKey, usize> = HashMap::new();

    for row in rows {
        match TapbackAction::classify(row.code, &row.text) {
            TapbackAction::Add(kind) => {
                let key = TapbackKey::new(row, kind.clone());
                if let Some(&slot) = index.get(&key) {
                    // One live tapback per sender per kind: replace in
                    // place, keeping the slot.
                    live[slot] = materialize(row, kind);
                } else {
                    index.insert(key, live.len());
                    live.push(materialize(row, kind));
                }
            }
            TapbackAction::Remove(kind) => {
                let key = TapbackKey::new(row, kind);
                if let Some(slot) = index.remove(&key) {
                    live.remove(slot);
                    index = rebuild_index(&live);
                }
            }
            TapbackAction::RemoveCustomFallback => {
                let slot = live.iter().position(|t| {
                    t.kind.is_custom() && t.sender == row.sender && t.is_from_me == row.is_from_me
                });
                if let Some(slot) = slot {
                    live.remove(slot);
                    index = rebuild_index(&live);
                }
            }
            TapbackAction::Skip => {}
        }
    }

    live
}

fn materialize(row: &TapbackRow, kind: TapbackType) -> Tapback {
    Tapback {
        rowid: row.rowid,
        kind,
        sender: row.sender.clone(),
        is_from_me: row.is_from_me,
        date: row.date,
        message_rowid: row.message_rowid,
    }
}

fn rebuild_index(live: &[Tapback]) -> HashMap<TapbackKey, usize> {
    live.iter()
        .enumerate()
        .map(|(slot, t)| {
            (
                TapbackKey {
                    sender: t.sender.clone(),
                    is_from_me: t.is_from_me,
                    kind: t.kind.clone(),
                },
                slot,
            )
        })
        .collect()
}
