//! Core type definitions for the repository.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stored record.
///
/// Record IDs are allocated from a per-type sequence. They are non-zero once
/// allocated, strictly increasing and never reused.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Creates a record ID from its raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns true for the zero value, which is never allocated.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of entity types held by the repository.
///
/// Every type owns a primary bucket named after it. Types that can be looked
/// up by name additionally own a `<type>.byname` bucket. Adding a type means
/// adding a variant here together with its bucket pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityType {
    /// Opaque binary objects. No name index.
    Blob,
    /// User accounts, indexed by user name.
    User,
    /// Groups of users, indexed by group name.
    Group,
}

impl EntityType {
    /// All entity types, in bucket creation order.
    pub const ALL: [EntityType; 3] = [EntityType::Blob, EntityType::User, EntityType::Group];

    /// Name of the primary bucket.
    #[must_use]
    pub const fn bucket(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::User => "user",
            Self::Group => "group",
        }
    }

    /// Name of the by-name index bucket, if this type has one.
    #[must_use]
    pub const fn name_bucket(self) -> Option<&'static str> {
        match self {
            Self::Blob => None,
            Self::User => Some("user.byname"),
            Self::Group => Some("group.byname"),
        }
    }

    /// Whether records of this type carry a unique, case-insensitive name.
    #[must_use]
    pub const fn is_named(self) -> bool {
        self.name_bucket().is_some()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bucket())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_ordering() {
        assert!(RecordId::new(1) < RecordId::new(2));
        assert!(RecordId::default().is_unset());
        assert!(!RecordId::new(7).is_unset());
    }

    #[test]
    fn bucket_names() {
        assert_eq!(EntityType::Blob.bucket(), "blob");
        assert_eq!(EntityType::User.name_bucket(), Some("user.byname"));
        assert_eq!(EntityType::Group.name_bucket(), Some("group.byname"));
        assert!(EntityType::Blob.name_bucket().is_none());
    }

    #[test]
    fn entity_type_display() {
        assert_eq!(format!("{}", EntityType::Group), "group");
    }
}
