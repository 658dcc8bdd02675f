//! Binary wire codec for [`TagContext`].
//!
//! Layout (version 0):
//!
//! ```text
//! +---------+----------+---------+-----+----------+-------+-----+
//! | version | field id | key len | key | value len| value | ... |
//! |  0x00   |   0x00   | varint  | u8s |  varint  |  u8s  |     |
//! +---------+----------+---------+-----+----------+-------+-----+
//! ```
//!
//! One `(field id, key, value)` group per tag, repeated zero or more
//! times. Lengths are LEB128 varints, keys and values are UTF-8. Tags are
//! written in key order, so equal contexts encode to identical bytes and
//! transports may compare or cache encodings.
//!
//! Decoding is all-or-nothing: every length is bounds-checked before the
//! bytes it covers are consumed, and any structural problem surfaces as a
//! [`DecodeError`] without touching shared state. The zero-length input is
//! the one special case - it decodes to the empty context, so peers that
//! omit the propagation header entirely still get well-defined behavior.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use thiserror::Error;

use crate::TagContext;

/// Version marker, the first byte of every encoding.
pub const WIRE_VERSION: u8 = 0;

/// Field id introducing one tag key/value group.
pub const TAG_FIELD_ID: u8 = 0;

/// Upper bound on the size of an encoded context, in bytes.
///
/// Contexts ride on every request a process makes, so transports need a
/// hard cap. The limit applies symmetrically: oversize contexts fail to
/// encode and oversize input is rejected before any of it is parsed.
pub const MAX_WIRE_SIZE: usize = 8192;

// Varint lengths are capped well below this, but a decoder still has to
// refuse shift amounts that would overflow a u64.
const MAX_VARINT_BYTES: usize = 10;

/// Errors from [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The encoded context would exceed [`MAX_WIRE_SIZE`].
    #[error("encoded context is {size} bytes, exceeding the {MAX_WIRE_SIZE} byte limit")]
    Oversize {
        /// Size the encoding would have had.
        size: usize,
    },
}

/// Errors from [`decode`].
///
/// Every variant means the input is not a well-formed version-0 encoding.
/// The caller typically falls back to [`TagContext::empty`] and carries
/// on; nothing has been partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The version byte is not [`WIRE_VERSION`].
    #[error("unsupported wire version {version}")]
    UnsupportedVersion {
        /// The version byte that was read.
        version: u8,
    },

    /// A tag group started with an unknown field id.
    #[error("unknown field id {field} at offset {offset}")]
    UnknownField {
        /// The field id byte that was read.
        field: u8,
        /// Offset of the offending byte.
        offset: usize,
    },

    /// The input ended in the middle of a length or its payload.
    #[error("input truncated at offset {offset}: need {needed} more bytes")]
    Truncated {
        /// Offset where the shortfall was detected.
        offset: usize,
        /// How many further bytes would have been required.
        needed: usize,
    },

    /// A length varint was malformed or too large to represent.
    #[error("malformed length varint at offset {offset}")]
    InvalidLength {
        /// Offset where the varint starts.
        offset: usize,
    },

    /// A key or value was not valid UTF-8.
    #[error("invalid utf-8 in tag data at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the string field.
        offset: usize,
    },

    /// The input exceeds [`MAX_WIRE_SIZE`].
    #[error("input is {size} bytes, exceeding the {MAX_WIRE_SIZE} byte limit")]
    Oversize {
        /// Size of the rejected input.
        size: usize,
    },
}

/// Encode a context into its canonical byte form.
///
/// Deterministic: equal contexts produce identical bytes. The empty
/// context encodes to the single version byte.
///
/// # Errors
///
/// [`EncodeError::Oversize`] if the encoding would exceed
/// [`MAX_WIRE_SIZE`]. Nothing is allocated in that case.
pub fn encode(context: &TagContext) -> Result<Vec<u8>, EncodeError> {
    let size = encoded_len(context);
    if size > MAX_WIRE_SIZE {
        return Err(EncodeError::Oversize { size });
    }

    let mut out = Vec::with_capacity(size);
    out.push(WIRE_VERSION);
    for (key, value) in context.iter() {
        out.push(TAG_FIELD_ID);
        put_varint(&mut out, key.len() as u64);
        out.extend_from_slice(key.as_bytes());
        put_varint(&mut out, value.len() as u64);
        out.extend_from_slice(value.as_bytes());
    }
    debug_assert_eq!(out.len(), size);
    Ok(out)
}

/// Decode a byte sequence into a context.
///
/// - Zero-length input decodes to [`TagContext::empty`]; absence of a
///   context is not an error.
/// - Malformed input (wrong version byte, truncated fields, bad UTF-8,
///   oversize payload) returns a [`DecodeError`] and leaves no partial
///   result behind.
/// - Duplicate keys are permitted on the wire; the last occurrence wins.
pub fn decode(bytes: &[u8]) -> Result<TagContext, DecodeError> {
    if bytes.is_empty() {
        return Ok(TagContext::empty());
    }
    if bytes.len() > MAX_WIRE_SIZE {
        return Err(DecodeError::Oversize { size: bytes.len() });
    }

    let version = bytes[0];
    if version != WIRE_VERSION {
        return Err(DecodeError::UnsupportedVersion { version });
    }

    let mut tags = BTreeMap::new();
    let mut offset = 1usize;
    while offset < bytes.len() {
        let field = bytes[offset];
        if field != TAG_FIELD_ID {
            return Err(DecodeError::UnknownField { field, offset });
        }
        offset += 1;

        let key = read_string(bytes, &mut offset)?;
        let value = read_string(bytes, &mut offset)?;
        tags.insert(key, value);
    }

    Ok(TagContext::from_map(tags))
}

/// Exact size [`encode`] would produce for this context.
pub fn encoded_len(context: &TagContext) -> usize {
    let mut size = 1; // version byte
    for (key, value) in context.iter() {
        size += 1 // field id
            + varint_len(key.len() as u64)
            + key.len()
            + varint_len(value.len() as u64)
            + value.len();
    }
    size
}

fn varint_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Read an LEB128 varint, advancing `offset` past it.
fn read_varint(bytes: &[u8], offset: &mut usize) -> Result<u64, DecodeError> {
    let start = *offset;
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = match bytes.get(*offset) {
            Some(&b) => b,
            None => {
                return Err(DecodeError::Truncated {
                    offset: *offset,
                    needed: 1,
                })
            }
        };
        *offset += 1;

        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }

        shift += 7;
        if *offset - start >= MAX_VARINT_BYTES {
            return Err(DecodeError::InvalidLength { offset: start });
        }
    }
}

/// Read a length-prefixed UTF-8 string, advancing `offset` past it.
///
/// The length is validated against the remaining input before any bytes
/// are consumed, so truncated input can never cause an out-of-bounds
/// read.
fn read_string(bytes: &[u8], offset: &mut usize) -> Result<String, DecodeError> {
    let len_offset = *offset;
    let len = read_varint(bytes, offset)?;

    // Lengths beyond the whole-message cap can only be garbage.
    if len > MAX_WIRE_SIZE as u64 {
        return Err(DecodeError::InvalidLength { offset: len_offset });
    }
    let len = len as usize;

    let remaining = bytes.len() - *offset;
    if len > remaining {
        return Err(DecodeError::Truncated {
            offset: *offset,
            needed: len - remaining,
        });
    }

    let data = &bytes[*offset..*offset + len];
    let text = core::str::from_utf8(data)
        .map_err(|_| DecodeError::InvalidUtf8 { offset: *offset })?;
    *offset += len;
    Ok(String::from(text))
}

#[cfg(test)]
mod tests {
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec;

    use super::*;

    fn sample_context() -> TagContext {
        TagContext::builder()
            .insert("service", "checkout")
            .insert("region", "eu-west-1")
            .insert("tier", "canary")
            .build()
    }

    // ========================================================================
    // Round-trip Tests
    // ========================================================================

    #[test]
    fn round_trip_preserves_tags() {
        let context = sample_context();
        let bytes = encode(&context).unwrap();
        assert_eq!(decode(&bytes).unwrap(), context);
    }

    #[test]
    fn round_trip_empty_context() {
        let bytes = encode(&TagContext::empty()).unwrap();
        assert_eq!(bytes, [WIRE_VERSION]);
        assert_eq!(decode(&bytes).unwrap(), TagContext::empty());
    }

    #[test]
    fn round_trip_empty_key_and_value() {
        let context = TagContext::builder().insert("", "").build();
        let bytes = encode(&context).unwrap();
        assert_eq!(bytes, [WIRE_VERSION, TAG_FIELD_ID, 0, 0]);
        assert_eq!(decode(&bytes).unwrap(), context);
    }

    #[test]
    fn round_trip_unicode_tags() {
        let context = TagContext::builder()
            .insert("région", "île-de-france")
            .insert("地区", "华东")
            .build();
        let bytes = encode(&context).unwrap();
        assert_eq!(decode(&bytes).unwrap(), context);
    }

    #[test]
    fn round_trip_long_values_use_multi_byte_varints() {
        let value = "v".repeat(300);
        let context = TagContext::builder().insert("key", &value).build();
        let bytes = encode(&context).unwrap();
        // 300 needs two varint bytes.
        assert_eq!(bytes.len(), 1 + 1 + 1 + 3 + 2 + 300);
        assert_eq!(decode(&bytes).unwrap().get("key"), Some(value.as_str()));
    }

    #[test]
    fn encoding_is_canonical_across_insertion_order() {
        let a = TagContext::builder()
            .insert("x", "1")
            .insert("y", "2")
            .build();
        let b = TagContext::builder()
            .insert("y", "2")
            .insert("x", "1")
            .build();
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn encoded_len_matches_encode() {
        for context in [TagContext::empty(), sample_context()] {
            assert_eq!(encode(&context).unwrap().len(), encoded_len(&context));
        }
    }

    // ========================================================================
    // Decode Edge Cases
    // ========================================================================

    #[test]
    fn decode_empty_input_is_the_default_context() {
        assert_eq!(decode(&[]).unwrap(), TagContext::empty());
    }

    #[test]
    fn decode_rejects_known_bad_input() {
        // Corrupt-input corpus pattern: wrong version byte up front.
        let bad = b"\x02as\x03df\x02";
        assert_eq!(
            decode(bad),
            Err(DecodeError::UnsupportedVersion { version: 2 })
        );
    }

    #[test]
    fn decode_rejects_future_versions() {
        assert_eq!(
            decode(&[1]),
            Err(DecodeError::UnsupportedVersion { version: 1 })
        );
    }

    #[test]
    fn decode_rejects_unknown_field_id() {
        assert_eq!(
            decode(&[WIRE_VERSION, 7]),
            Err(DecodeError::UnknownField { field: 7, offset: 1 })
        );
    }

    #[test]
    fn decode_rejects_truncated_key_length() {
        // Field id but nothing after it.
        assert_eq!(
            decode(&[WIRE_VERSION, TAG_FIELD_ID]),
            Err(DecodeError::Truncated { offset: 2, needed: 1 })
        );
    }

    #[test]
    fn decode_rejects_truncated_key_body() {
        // Key claims 5 bytes, only 2 present.
        assert_eq!(
            decode(&[WIRE_VERSION, TAG_FIELD_ID, 5, b'a', b'b']),
            Err(DecodeError::Truncated { offset: 3, needed: 3 })
        );
    }

    #[test]
    fn decode_rejects_truncated_value() {
        // Valid key "k", then value length with no body.
        assert_eq!(
            decode(&[WIRE_VERSION, TAG_FIELD_ID, 1, b'k', 4]),
            Err(DecodeError::Truncated { offset: 5, needed: 4 })
        );
    }

    #[test]
    fn decode_rejects_truncation_anywhere_inside_a_tag() {
        // Single tag, so every strict prefix past the version byte lands
        // mid-group; a cut at a tag-group boundary would itself be a
        // valid shorter encoding.
        let context = TagContext::builder().insert("service", "checkout").build();
        let bytes = encode(&context).unwrap();
        for cut in 2..bytes.len() {
            assert!(
                decode(&bytes[..cut]).is_err(),
                "truncation at {cut} must not decode"
            );
        }
    }

    #[test]
    fn decode_rejects_absurd_length_prefix() {
        // Varint encoding of u64::MAX as a key length.
        let mut bytes = vec![WIRE_VERSION, TAG_FIELD_ID];
        put_varint(&mut bytes, u64::MAX);
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::InvalidLength { offset: 2 })
        );
    }

    #[test]
    fn decode_rejects_unterminated_varint() {
        let mut bytes = vec![WIRE_VERSION, TAG_FIELD_ID];
        bytes.extend_from_slice(&[0x80; 12]);
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidLength { .. }));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let bytes = [WIRE_VERSION, TAG_FIELD_ID, 2, 0xff, 0xfe, 0];
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::InvalidUtf8 { offset: 3 })
        );
    }

    #[test]
    fn decode_rejects_oversize_input() {
        let bytes = vec![0u8; MAX_WIRE_SIZE + 1];
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::Oversize { size: MAX_WIRE_SIZE + 1 })
        );
    }

    #[test]
    fn decode_duplicate_keys_last_wins() {
        let mut bytes = vec![WIRE_VERSION];
        for value in [b"old", b"new"] {
            bytes.push(TAG_FIELD_ID);
            bytes.push(3);
            bytes.extend_from_slice(b"env");
            bytes.push(3);
            bytes.extend_from_slice(value);
        }
        let context = decode(&bytes).unwrap();
        assert_eq!(context.get("env"), Some("new"));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn decode_version_byte_only_is_empty() {
        assert_eq!(decode(&[WIRE_VERSION]).unwrap(), TagContext::empty());
    }

    // ========================================================================
    // Encode Limits
    // ========================================================================

    #[test]
    fn encode_rejects_oversize_context() {
        let mut builder = TagContext::builder();
        for i in 0..100 {
            builder = builder.insert(format!("key-{i}"), "x".repeat(100));
        }
        let context = builder.build();
        let err = encode(&context).unwrap_err();
        assert!(matches!(err, EncodeError::Oversize { size } if size > MAX_WIRE_SIZE));
    }

    #[test]
    fn encode_accepts_context_at_the_limit() {
        // 1 (version) + 1 (field) + 1 (len) + 1 (key) + 2 (len) + 8186 = 8192.
        let context = TagContext::builder().insert("k", "v".repeat(8186)).build();
        let bytes = encode(&context).unwrap();
        assert_eq!(bytes.len(), MAX_WIRE_SIZE);
        assert_eq!(decode(&bytes).unwrap(), context);
    }

    #[test]
    fn errors_render_offsets() {
        let err = DecodeError::UnknownField { field: 9, offset: 4 };
        assert_eq!(err.to_string(), "unknown field id 9 at offset 4");
    }
}
