//! Conditional updates with fingerprint preconditions.
//!
//! Every function here runs in exactly one store transaction. Mutations of
//! existing records go through [`modify`], which refuses to write unless the
//! caller proves it has seen the current version by quoting its
//! [`Fingerprint`].

use crate::codec::{decode, encode, fingerprint, Entity};
use crate::error::{RepoError, RepoResult, ValidationError};
use crate::fingerprint::Fingerprint;
use crate::key::name_key;
use crate::store::ObjectStore;
use crate::transaction::Reader;
use crate::types::RecordId;
use std::fmt;

/// How a request addresses a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// By primary key.
    Id(RecordId),
    /// By unique name, case-insensitively.
    Name(String),
}

impl Target {
    /// Resolves the target to a primary key within `tx`.
    ///
    /// A name that is not indexed fails with `NotFound`. An id is returned
    /// as is; whether it exists is checked by the read that follows.
    pub fn resolve<R: Reader>(&self, tx: &R) -> RepoResult<RecordId> {
        match self {
            Self::Id(id) => Ok(*id),
            Self::Name(name) => tx.lookup(name),
        }
    }
}

impl From<RecordId> for Target {
    fn from(id: RecordId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Whether a patch is being applied to a new or an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// The record is being created.
    New,
    /// The record already exists.
    Existing,
}

/// A partial update to an entity.
pub trait Patch<E> {
    /// Checks field constraints before anything is read or written.
    ///
    /// For `Lifetime::Existing`, identity fields such as the unique name
    /// must be absent or unchanged.
    fn validate(&self, lifetime: Lifetime) -> Result<(), ValidationError>;

    /// Copies the fields present in the patch onto `entity`.
    fn apply(&self, entity: &mut E);
}

/// An entity together with the fingerprint of its stored form.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<E> {
    /// The decoded entity.
    pub entity: E,
    /// Fingerprint to quote in the next conditional update.
    pub fingerprint: Fingerprint,
}

fn encode_versioned<E: Entity>(entity: E) -> RepoResult<(Vec<u8>, Versioned<E>)> {
    let bytes = encode(&entity)?;
    let fingerprint = Fingerprint::of(&bytes);
    Ok((bytes, Versioned { entity, fingerprint }))
}

/// Creates a new record from `patch`.
///
/// Allocates the id, claims the name and writes the record in one
/// transaction. If the name is taken the whole transaction aborts with
/// `Duplicate` and the id is not consumed.
pub fn create<E, P>(store: &ObjectStore, patch: &P) -> RepoResult<Versioned<E>>
where
    E: Entity + Default,
    P: Patch<E>,
{
    store.update(E::TYPE, |tx| {
        patch.validate(Lifetime::New)?;

        let mut entity = E::default();
        patch.apply(&mut entity);

        let id = tx.allocate_id()?;
        entity.set_id(id);
        if let Some(name) = entity.name() {
            tx.associate(id, name)?;
        }

        let (bytes, versioned) = encode_versioned(entity)?;
        tx.put(id, &bytes)?;
        tracing::debug!(entity_type = %E::TYPE, %id, "created record");
        Ok(versioned)
    })
}

/// Applies `patch` to an existing record if `if_match` names its current
/// fingerprint.
///
/// # Errors
///
/// - `Invalid` if the patch fails validation; nothing is read
/// - `NotFound` if `target` does not resolve to a stored record
/// - `PreconditionRequired` if `if_match` is absent or empty
/// - `PreconditionFailed` if `if_match` names another version
///
/// Both precondition errors carry the current fingerprint.
pub fn modify<E, P>(
    store: &ObjectStore,
    target: &Target,
    if_match: Option<&str>,
    patch: &P,
) -> RepoResult<Versioned<E>>
where
    E: Entity,
    P: Patch<E>,
{
    store.update(E::TYPE, |tx| {
        patch.validate(Lifetime::Existing)?;

        let id = target.resolve(&*tx)?;
        let mut entity: E = decode(id, &tx.get(id)?)?;
        let current = fingerprint(&entity)?;

        match if_match.map(str::trim).filter(|tag| !tag.is_empty()) {
            None => return Err(RepoError::PreconditionRequired { current }),
            Some(tag) if !current.matches(tag) => {
                return Err(RepoError::PreconditionFailed { current })
            }
            Some(_) => {}
        }

        let old_name = entity.name().map(str::to_owned);
        patch.apply(&mut entity);
        entity.set_id(id);

        if let Some(old_name) = old_name {
            let new_name = entity.name().unwrap_or_default();
            if new_name != old_name {
                tx.associate(id, new_name)?;
                if name_key(new_name) != name_key(&old_name) {
                    tx.unassociate(&old_name)?;
                }
            }
        }

        let (bytes, versioned) = encode_versioned(entity)?;
        tx.put(id, &bytes)?;
        tracing::debug!(entity_type = %E::TYPE, %id, "modified record");
        Ok(versioned)
    })
}

/// Reads a record and its fingerprint.
pub fn fetch<E: Entity>(store: &ObjectStore, target: &Target) -> RepoResult<Versioned<E>> {
    store.view(E::TYPE, |tx| {
        let id = target.resolve(tx)?;
        let entity: E = decode(id, &tx.get(id)?)?;
        let fingerprint = fingerprint(&entity)?;
        Ok(Versioned {
            entity,
            fingerprint,
        })
    })
}

/// Deletes a record and releases its name.
///
/// Returns the entity as it was before deletion.
pub fn remove<E: Entity>(store: &ObjectStore, target: &Target) -> RepoResult<E> {
    store.update(E::TYPE, |tx| {
        let id = target.resolve(&*tx)?;
        let entity: E = decode(id, &tx.get(id)?)?;

        tx.delete(id)?;
        if let Some(name) = entity.name() {
            tx.unassociate(name)?;
        }
        tracing::debug!(entity_type = %E::TYPE, %id, "removed record");
        Ok(entity)
    })
}

/// Decodes every record of `E`'s type in ascending id order.
pub fn list<E: Entity>(store: &ObjectStore) -> RepoResult<Vec<E>> {
    store.view(E::TYPE, |tx| {
        let mut out = Vec::new();
        tx.for_each(|id, bytes| {
            out.push(decode(id, bytes)?);
            Ok(())
        })?;
        Ok(out)
    })
}
