//! Key encoding for primary and name-index buckets.
//!
//! Primary keys and name-index values are fixed-width 8-byte big-endian
//! integers, so byte order equals numeric order. Name-index keys are the
//! lowercased UTF-8 name.

use crate::error::{RepoError, RepoResult};
use crate::types::RecordId;

/// Width of an encoded record ID.
pub const ID_LEN: usize = 8;

/// Encodes a record ID as an 8-byte big-endian key.
#[inline]
#[must_use]
pub fn encode_id(id: RecordId) -> [u8; ID_LEN] {
    id.as_u64().to_be_bytes()
}

/// Decodes an 8-byte big-endian key read from `bucket`.
///
/// Any other length means the bucket was written by something other than
/// this crate and is reported as corruption.
pub fn decode_id(bucket: &str, bytes: &[u8]) -> RepoResult<RecordId> {
    let arr: [u8; ID_LEN] = bytes.try_into().map_err(|_| {
        RepoError::corrupted(
            bucket,
            format!("expected {ID_LEN}-byte id, found {} bytes", bytes.len()),
        )
    })?;
    Ok(RecordId::new(u64::from_be_bytes(arr)))
}

/// Normalizes a name to its index key.
#[must_use]
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_is_big_endian() {
        assert_eq!(encode_id(RecordId::new(1)), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(
            encode_id(RecordId::new(0x0102_0304_0506_0708)),
            [1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn byte_order_matches_numeric_order() {
        let ids = [1u64, 2, 255, 256, 65_536, u64::MAX];
        for pair in ids.windows(2) {
            let a = encode_id(RecordId::new(pair[0]));
            let b = encode_id(RecordId::new(pair[1]));
            assert!(a < b, "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn decode_accepts_exact_width() {
        let id = decode_id("user", &encode_id(RecordId::new(42))).unwrap();
        assert_eq!(id, RecordId::new(42));
    }

    #[test]
    fn decode_rejects_other_widths() {
        let long = decode_id("user", &[0u8; 9]);
        assert!(matches!(long, Err(RepoError::Corrupted { .. })));

        let short = decode_id("user.byname", &[1u8, 2]);
        assert!(matches!(short, Err(RepoError::Corrupted { .. })));
    }

    #[test]
    fn name_key_lowercases() {
        assert_eq!(name_key("Bob"), "bob");
        assert_eq!(name_key("ÉLODIE"), "élodie");
    }
}
