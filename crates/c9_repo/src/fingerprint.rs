//! Content fingerprints for optimistic concurrency.
//!
//! A fingerprint is the SHA-256 digest of a record's canonical serialized
//! form. It is rendered on the wire as a quoted hex entity tag.

use sha2::{Digest, Sha256};
use std::fmt;

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Deterministic digest of a record's canonical bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Computes the fingerprint of the given bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; FINGERPRINT_LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Returns the raw digest.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Returns the lowercase hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the quoted entity-tag form, e.g. `"3a7b..."`.
    #[must_use]
    pub fn to_etag(&self) -> String {
        format!("\"{}\"", self.to_hex())
    }

    /// Parses an entity tag produced by [`Fingerprint::to_etag`].
    ///
    /// Surrounding whitespace and quotes are optional. Returns `None` for
    /// anything that is not a full-length hex digest.
    #[must_use]
    pub fn parse_etag(etag: &str) -> Option<Self> {
        let hex_part = etag.trim().trim_matches('"');
        let bytes = hex::decode(hex_part).ok()?;
        let arr: [u8; FINGERPRINT_LEN] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Whether a caller-supplied entity tag names this fingerprint.
    #[must_use]
    pub fn matches(&self, etag: &str) -> bool {
        Self::parse_etag(etag).is_some_and(|other| other == *self)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_etag())
    }
}
