//! Error types for the repository.

use crate::fingerprint::Fingerprint;
use crate::types::{EntityType, RecordId};
use std::fmt;
use std::io;
use thiserror::Error;

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// How a missing record was addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    /// Addressed by primary key.
    Id(RecordId),
    /// Addressed through the name index.
    Name(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// A field-level validation failure reported by a [`Patch`](crate::Patch).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    /// Creates a validation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepoError {
    /// The referenced id or name does not exist.
    #[error("{entity_type} not found: {key}")]
    NotFound {
        /// Type that was searched.
        entity_type: EntityType,
        /// The id or name that was not found.
        key: Key,
    },

    /// The name is already claimed by a different record.
    #[error(
        "duplicate {entity_type}: wanted name {desired_name:?}, but id {existing_id} already has that name"
    )]
    Duplicate {
        /// Type whose name index rejected the write.
        entity_type: EntityType,
        /// Record that owns the name.
        existing_id: RecordId,
        /// Name the caller asked for, as given.
        desired_name: String,
    },

    /// A conditional update arrived without an expected fingerprint.
    #[error("precondition required: current fingerprint is {current}")]
    PreconditionRequired {
        /// Fingerprint of the stored record.
        current: Fingerprint,
    },

    /// A conditional update carried a fingerprint that no longer matches.
    #[error("precondition failed: current fingerprint is {current}")]
    PreconditionFailed {
        /// Fingerprint of the stored record.
        current: Fingerprint,
    },

    /// A patch failed validation.
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationError),

    /// A name operation was attempted on a type without a name index.
    #[error("{0} has no name index")]
    NoNameIndex(EntityType),

    /// Another process holds the repository directory.
    #[error("repository locked: another process has exclusive access")]
    Locked,

    /// Stored data violates a layout invariant.
    #[error("corrupted bucket {bucket}: {reason}")]
    Corrupted {
        /// Bucket holding the bad entry.
        bucket: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The repository directory is unusable.
    #[error("invalid repository: {message}")]
    InvalidLayout {
        /// Description of the problem.
        message: String,
    },

    /// Storage engine failure.
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// Record encoding or decoding failure.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RepoError {
    /// Creates a not-found error for a primary key.
    pub fn not_found_id(entity_type: EntityType, id: RecordId) -> Self {
        Self::NotFound {
            entity_type,
            key: Key::Id(id),
        }
    }

    /// Creates a not-found error for a name lookup.
    pub fn not_found_name(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            key: Key::Name(name.into()),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates an invalid layout error.
    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::InvalidLayout {
            message: message.into(),
        }
    }

    /// Returns true if the referenced record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the name is claimed by another record.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// Returns true for data corruption and programming errors.
    ///
    /// These are never recoverable by retrying or by changing the request.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupted { .. } | Self::NoNameIndex(_))
    }

    /// Returns the current fingerprint carried by a precondition error.
    #[must_use]
    pub fn current_fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Self::PreconditionRequired { current } | Self::PreconditionFailed { current } => {
                Some(current)
            }
            _ => None,
        }
    }
}

macro_rules! storage_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for RepoError {
                fn from(err: $source) -> Self {
                    Self::Storage(redb::Error::from(err))
                }
            }
        )*
    };
}

storage_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = RepoError::not_found_id(EntityType::User, RecordId::new(7));
        assert_eq!(err.to_string(), "user not found: id 7");

        let err = RepoError::not_found_name(EntityType::Group, "admins");
        assert_eq!(err.to_string(), "group not found: name \"admins\"");
        assert!(err.is_not_found());
    }

    #[test]
    fn duplicate_display() {
        let err = RepoError::Duplicate {
            entity_type: EntityType::User,
            existing_id: RecordId::new(1),
            desired_name: "Alice".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"Alice\""));
        assert!(msg.contains("id 1"));
        assert!(err.is_duplicate());
    }

    #[test]
    fn classification() {
        assert!(RepoError::corrupted("user", "key of length 9").is_fatal());
        assert!(RepoError::NoNameIndex(EntityType::Blob).is_fatal());
        assert!(!RepoError::not_found_id(EntityType::Blob, RecordId::new(1)).is_fatal());
    }

    #[test]
    fn precondition_carries_fingerprint() {
        let current = Fingerprint::of(b"payload");
        let err = RepoError::PreconditionFailed { current };
        assert_eq!(err.current_fingerprint(), Some(&current));
        assert!(RepoError::Locked.current_fingerprint().is_none());
    }
}
