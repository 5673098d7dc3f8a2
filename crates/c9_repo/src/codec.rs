//! Typed entity encoding.
//!
//! Structured records are stored as CBOR produced by `ciborium`. Struct
//! fields are written in declaration order, so identical values always
//! encode to identical bytes and the encoding can be fingerprinted.

use crate::error::{RepoError, RepoResult};
use crate::fingerprint::Fingerprint;
use crate::types::{EntityType, RecordId};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A structured record that lives in one entity type's bucket.
///
/// The primary key is authoritative for the id: [`decode`] overwrites
/// whatever id the payload carries with the key it was read from.
pub trait Entity: Serialize + DeserializeOwned {
    /// The bucket pair this entity is stored in.
    const TYPE: EntityType;

    /// Returns the record id, zero if not yet allocated.
    fn id(&self) -> RecordId;

    /// Sets the record id.
    fn set_id(&mut self, id: RecordId);

    /// Returns the unique name, for types with a name index.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Encodes an entity to its canonical bytes.
pub fn encode<E: Entity>(entity: &E) -> RepoResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(entity, &mut buf)
        .map_err(|e| RepoError::codec(format!("failed to encode {}: {e}", E::TYPE)))?;
    Ok(buf)
}

/// Decodes an entity read from primary key `id`.
pub fn decode<E: Entity>(id: RecordId, bytes: &[u8]) -> RepoResult<E> {
    let mut entity: E = ciborium::from_reader(bytes)
        .map_err(|e| RepoError::codec(format!("failed to decode {} {id}: {e}", E::TYPE)))?;
    entity.set_id(id);
    Ok(entity)
}

/// Computes the fingerprint of an entity's canonical encoding.
pub fn fingerprint<E: Entity>(entity: &E) -> RepoResult<Fingerprint> {
    Ok(Fingerprint::of(&encode(entity)?))
}
