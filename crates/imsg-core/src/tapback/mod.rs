//! Tapback event model and row classifier.
//!
//! The Messages log never mutates rows: every tapback add, change, and
//! removal is a fresh `message` row whose `associated_message_type` encodes
//! the action. This module maps those raw rows to typed actions; the
//! [`resolver`] folds the actions into the current live set.

pub mod resolver;

pub use resolver::resolve_tapbacks;

use chrono::{DateTime, Utc};
use serde::Serialize;
use unicode_properties::UnicodeEmoji;
use unicode_segmentation::UnicodeSegmentation;

/// First type code of the standard add range (`2000..=2005`).
const ADD_BASE: i64 = 2000;
/// Custom-emoji add event.
const ADD_CUSTOM: i64 = 2006;
/// First type code of the standard removal range (`3000..=3005`).
const REMOVE_BASE: i64 = 3000;
/// Custom-emoji removal event.
const REMOVE_CUSTOM: i64 = 3006;

/// A tapback kind.
///
/// Six fixed categories in the wire order of their type codes, plus the
/// free-form emoji tapback introduced in newer OS versions. For
/// deduplication, `Custom` compares by the exact grapheme string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TapbackType {
    Loved,
    Liked,
    Disliked,
    Laughed,
    Emphasized,
    Questioned,
    /// Free-form emoji tapback; holds the emoji grapheme.
    Custom(String),
}

impl TapbackType {
    /// Map an offset within the standard range (`0..=5`) to its kind.
    ///
    /// The order is fixed by the wire format: 0=loved, 1=liked, 2=disliked,
    /// 3=laughed, 4=emphasized, 5=questioned.
    const fn from_offset(offset: i64) -> Option<Self> {
        match offset {
            0 => Some(Self::Loved),
            1 => Some(Self::Liked),
            2 => Some(Self::Disliked),
            3 => Some(Self::Laughed),
            4 => Some(Self::Emphasized),
            5 => Some(Self::Questioned),
            _ => None,
        }
    }

    /// Whether this is the free-form emoji kind.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl std::fmt::Display for TapbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loved => write!(f, "loved"),
            Self::Liked => write!(f, "liked"),
            Self::Disliked => write!(f, "disliked"),
            Self::Laughed => write!(f, "laughed"),
            Self::Emphasized => write!(f, "emphasized"),
            Self::Questioned => write!(f, "questioned"),
            Self::Custom(emoji) => write!(f, "{emoji}"),
        }
    }
}

/// One raw tapback event row, as read from the log.
///
/// A historical fact; never mutated after being read. `sender` is empty for
/// rows whose handle could not be resolved (self rows carry `is_from_me`).
#[derive(Debug, Clone)]
pub struct TapbackRow {
    pub rowid: i64,
    /// `associated_message_type` value.
    pub code: i64,
    pub sender: String,
    pub is_from_me: bool,
    pub date: DateTime<Utc>,
    /// Resolved text: the `text` column, or the attributed-body extraction
    /// when that column is empty. May be empty.
    pub text: String,
    /// ROWID of the message this event targets.
    pub message_rowid: i64,
}

/// A live, resolved tapback on a target message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tapback {
    /// ROWID of the event row this tapback currently derives from.
    pub rowid: i64,
    pub kind: TapbackType,
    pub sender: String,
    pub is_from_me: bool,
    pub date: DateTime<Utc>,
    pub message_rowid: i64,
}

/// The classified meaning of one raw event row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapbackAction {
    /// Apply (or supersede) a tapback of the given kind.
    Add(TapbackType),
    /// Retract the tapback of the given kind, if live.
    Remove(TapbackType),
    /// A custom-emoji removal whose emoji could not be determined: retract
    /// whichever custom tapback is live for the sender.
    RemoveCustomFallback,
    /// Not a tapback event, or an unclassifiable one.
    Skip,
}

impl TapbackAction {
    /// Classify a raw `(type code, resolved text)` pair.
    ///
    /// Codes outside the known ranges are skipped rather than rejected, so
    /// that logs written by newer OS versions never break older readers.
    #[must_use]
    pub fn classify(code: i64, text: &str) -> Self {
        match code {
            ADD_BASE..ADD_CUSTOM => match TapbackType::from_offset(code - ADD_BASE) {
                Some(kind) => Self::Add(kind),
                None => Self::Skip,
            },
            ADD_CUSTOM => extract_custom_emoji(text)
                .map_or(Self::Skip, |emoji| Self::Add(TapbackType::Custom(emoji))),
            REMOVE_BASE..REMOVE_CUSTOM => match TapbackType::from_offset(code - REMOVE_BASE) {
                Some(kind) => Self::Remove(kind),
                None => Self::Skip,
            },
            REMOVE_CUSTOM => extract_custom_emoji(text).map_or(Self::RemoveCustomFallback, |e| {
                Self::Remove(TapbackType::Custom(e))
            }),
            _ => Self::Skip,
        }
    }
}

/// Extract the emoji from a custom-tapback summary text.
///
/// The emoji has no dedicated column; it only appears in the event's summary
/// text, `Reacted <emoji> to <quoted message>`. Takes the substring between
/// the two markers when both are present and non-empty, otherwise falls back
/// to scanning for the first emoji grapheme in the text.
#[must_use]
pub fn extract_custom_emoji(text: &str) -> Option<String> {
    if let Some((_, after)) = text.split_once("Reacted ") {
        if let Some((emoji, _)) = after.split_once(" to ") {
            if !emoji.is_empty() {
                return Some(emoji.to_string());
            }
        }
    }
    first_emoji_grapheme(text)
}

/// Find the first grapheme in `text` that reads as an emoji.
///
/// A grapheme qualifies when its leading scalar carries the Unicode emoji
/// property. ASCII scalars are excluded outright: digits, `#`, and `*` carry
/// the property but are plainly not emoji in summary text.
fn first_emoji_grapheme(text: &str) -> Option<String> {
    text.graphemes(true)
        .find(|grapheme| grapheme.chars().next().is_some_and(is_emoji_scalar))
        .map(str::to_string)
}

fn is_emoji_scalar(ch: char) -> bool {
    !ch.is_ascii() && ch.is_emoji_char()
}

/// Whether an event row's `associated_message_guid` targets the message with
/// `target_guid`.
///
/// Matches either the bare GUID or the multi-part form
/// `<part-index>/<guid>` (for example `p:0/<guid>`). An empty target GUID
/// never correlates.
#[must_use]
pub fn correlates_with(associated_guid: &str, target_guid: &str) -> bool {
    if target_guid.is_empty() {
        return false;
    }
    associated_guid == target_guid
        || associated_guid
            .strip_suffix(target_guid)
            .is_some_and(|prefix| prefix.ends_with('/'))
}
