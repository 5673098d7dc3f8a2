//! # C9 Repository
//!
//! Transactional object repository for the C9 resource service.
//!
//! This crate maps typed entities onto the buckets of a single embedded
//! `redb` store:
//! - One primary bucket per [`EntityType`], keyed by 8-byte big-endian ids
//! - A durable, never-reused id sequence per type
//! - A case-insensitive, unique name index for named types
//! - Optimistic concurrency through content [`Fingerprint`]s
//!
//! ## Example
//!
//! ```rust,ignore
//! use c9_repo::{conditional, ObjectStore, Target};
//!
//! let store = ObjectStore::open(Path::new("/srv/c9"))?;
//! let user: Versioned<User> = conditional::fetch(&store, &Target::Name("alice".into()))?;
//! let updated = conditional::modify(
//!     &store,
//!     &Target::Id(user.entity.id),
//!     Some(&user.fingerprint.to_etag()),
//!     &patch,
//! )?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
pub mod conditional;
mod config;
mod dir;
mod error;
mod fingerprint;
mod key;
mod store;
mod transaction;
mod types;

pub use codec::{decode, encode, fingerprint, Entity};
pub use conditional::{Lifetime, Patch, Target, Versioned};
pub use config::{RepoConfig, DEFAULT_DB_FILE};
pub use dir::RepoDir;
pub use error::{Key, RepoError, RepoResult, ValidationError};
pub use fingerprint::{Fingerprint, FINGERPRINT_LEN};
pub use key::{decode_id, encode_id, name_key, ID_LEN};
pub use store::{BucketStats, ObjectStore};
pub use transaction::{ReadTx, Reader, WriteTx};
pub use types::{EntityType, RecordId};
