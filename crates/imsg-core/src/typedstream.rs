//! Attributed-body text extraction.
//!
//! Messages stores rich text as an archived `NSAttributedString` in the
//! `attributedBody` blob. We only ever need the plain-text field, so instead
//! of a full typedstream decoder this walks the bytes to the first `NSString`
//! payload: the class name marker, then the `+` string-data tag, then a
//! length-prefixed UTF-8 run. Anything malformed yields `None` — callers
//! treat that as "no text", never as an error.

const CLASS_MARKER: &[u8] = b"NSString";

/// String-data tag that precedes the length-prefixed payload.
const STRING_TAG: u8 = 0x2B;

/// Extract the plain-text field from an `attributedBody` blob.
///
/// Returns `None` for empty, truncated, or undecodable input.
#[must_use]
pub fn extract_text(blob: &[u8]) -> Option<String> {
    let class_at = find(blob, CLASS_MARKER)?;
    let rest = &blob[class_at + CLASS_MARKER.len()..];

    let tag_at = rest.iter().position(|&b| b == STRING_TAG)?;
    let (len, data) = read_length(&rest[tag_at + 1..])?;

    let bytes = data.get(..len)?;
    let text = std::str::from_utf8(bytes).ok()?;
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Read a typedstream length prefix.
///
/// A single byte below `0x81` is the literal length; `0x81` is followed by a
/// little-endian u16, `0x82` by a little-endian u32.
fn read_length(bytes: &[u8]) -> Option<(usize, &[u8])> {
    match *bytes.first()? {
        0x81 => {
            let len = u16::from_le_bytes([*bytes.get(1)?, *bytes.get(2)?]);
            Some((len as usize, &bytes[3..]))
        }
        0x82 => {
            let len = u32::from_le_bytes([
                *bytes.get(1)?,
                *bytes.get(2)?,
                *bytes.get(3)?,
                *bytes.get(4)?,
            ]);
            Some((len as usize, &bytes[5..]))
        }
        n if n < 0x81 => Some((n as usize, &bytes[1..])),
        _ => None,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation)]
mod tests {
    use super::*;

    /// Build a blob that mimics the shape of a real archived string:
    /// leading archive header bytes, the class name, some class-hierarchy
    /// bytes, then the `+` tag and a length-prefixed payload.
    fn blob_with_text(text: &[u8]) -> Vec<u8> {
        let mut blob = vec![0x04, 0x0B, b's', b't', b'r', b'e', b'a', b'm', b't', b'y'];
        blob.extend_from_slice(CLASS_MARKER);
        blob.extend_from_slice(&[0x01, 0x94, 0x84, 0x01, STRING_TAG]);
        if text.len() < 0x81 {
            blob.push(text.len() as u8);
        } else {
            blob.push(0x81);
            blob.extend_from_slice(&(text.len() as u16).to_le_bytes());
        }
        blob.extend_from_slice(text);
        blob
    }

    #[test]
    fn test_extracts_short_string() {
        let blob = blob_with_text("Hello world".as_bytes());
        assert_eq!(extract_text(&blob).as_deref(), Some("Hello world"));
    }

    #[test]
    fn test_extracts_long_string_with_u16_length() {
        let text = "a".repeat(500);
        let blob = blob_with_text(text.as_bytes());
        assert_eq!(extract_text(&blob).as_deref(), Some(text.as_str()));
    }

    #[test]
    fn test_extracts_emoji_text() {
        let blob = blob_with_text("Reacted 🎉 to “hello”".as_bytes());
        assert_eq!(extract_text(&blob).as_deref(), Some("Reacted 🎉 to “hello”"));
    }

    #[test]
    fn test_empty_blob_yields_none() {
        assert_eq!(extract_text(&[]), None);
    }

    #[test]
    fn test_missing_class_marker_yields_none() {
        assert_eq!(extract_text(b"not a typedstream at all"), None);
    }

    #[test]
    fn test_truncated_payload_yields_none() {
        let mut blob = blob_with_text(b"Hello world");
        blob.truncate(blob.len() - 4);
        assert_eq!(extract_text(&blob), None);
    }

    #[test]
    fn test_invalid_utf8_yields_none() {
        let blob = blob_with_text(&[0xFF, 0xFE, 0xFD]);
        assert_eq!(extract_text(&blob), None);
    }

    #[test]
    fn test_zero_length_payload_yields_none() {
        let blob = blob_with_text(b"");
        assert_eq!(extract_text(&blob), None);
    }
}
