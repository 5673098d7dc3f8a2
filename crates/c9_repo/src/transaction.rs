//! Typed, bucket-scoped transactions.
//!
//! A transaction is bound to one [`EntityType`] and one storage engine
//! transaction. Read operations live on the [`Reader`] trait and work inside
//! both kinds of transaction; mutations exist only on [`WriteTx`].

use crate::error::{RepoError, RepoResult};
use crate::key::{decode_id, encode_id, name_key};
use crate::types::{EntityType, RecordId};
use redb::{ReadTransaction, ReadableTable, TableDefinition, WriteTransaction};

/// Bucket holding the per-type id sequences, keyed by primary bucket name.
pub(crate) const SEQUENCE_BUCKET: &str = "_sequence";

pub(crate) const SEQUENCE_TABLE: TableDefinition<'static, &'static str, u64> =
    TableDefinition::new(SEQUENCE_BUCKET);

/// Table definition for a primary or name-index bucket.
pub(crate) const fn bucket(
    name: &'static str,
) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
    TableDefinition::new(name)
}

fn name_bucket(entity_type: EntityType) -> RepoResult<&'static str> {
    entity_type
        .name_bucket()
        .ok_or(RepoError::NoNameIndex(entity_type))
}

/// Read operations shared by read-only and read-write transactions.
pub trait Reader {
    /// The entity type this transaction is scoped to.
    fn entity_type(&self) -> EntityType;

    /// Returns the payload stored at `id`.
    ///
    /// Fails with `NotFound` if there is no such record.
    fn get(&self, id: RecordId) -> RepoResult<Vec<u8>>;

    /// Returns true if a record is stored at `id`.
    fn contains(&self, id: RecordId) -> RepoResult<bool>;

    /// Visits every record in ascending id order.
    ///
    /// The walk sees exactly this transaction's snapshot. Returning an error
    /// from `visit` stops the walk and propagates the error.
    fn for_each<F>(&self, visit: F) -> RepoResult<()>
    where
        F: FnMut(RecordId, &[u8]) -> RepoResult<()>;

    /// Resolves a name to an id, ignoring case.
    ///
    /// Fails with `NotFound` if no record has that name.
    fn lookup(&self, name: &str) -> RepoResult<RecordId>;

    /// Number of records in the primary bucket.
    fn count(&self) -> RepoResult<u64>;
}

fn read_record<T>(table: &T, entity_type: EntityType, id: RecordId) -> RepoResult<Vec<u8>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let key = encode_id(id);
    match table.get(key.as_slice())? {
        Some(guard) => Ok(guard.value().to_vec()),
        None => Err(RepoError::not_found_id(entity_type, id)),
    }
}

fn walk_records<T, F>(table: &T, bucket_name: &str, mut visit: F) -> RepoResult<()>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
    F: FnMut(RecordId, &[u8]) -> RepoResult<()>,
{
    for entry in table.iter()? {
        let (key, value) = entry?;
        let id = decode_id(bucket_name, key.value())?;
        visit(id, value.value())?;
    }
    Ok(())
}

fn resolve_name<T>(table: &T, entity_type: EntityType, name: &str) -> RepoResult<RecordId>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let key = name_key(name);
    match table.get(key.as_bytes())? {
        Some(guard) => decode_id(name_bucket(entity_type)?, guard.value()),
        None => Err(RepoError::not_found_name(entity_type, name)),
    }
}

/// A read-only transaction over one entity type.
///
/// Sees a consistent point-in-time snapshot; concurrent writers never become
/// visible while it is alive.
pub struct ReadTx {
    txn: ReadTransaction,
    entity_type: EntityType,
}

impl ReadTx {
    pub(crate) fn new(txn: ReadTransaction, entity_type: EntityType) -> Self {
        Self { txn, entity_type }
    }
}

impl Reader for ReadTx {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    fn get(&self, id: RecordId) -> RepoResult<Vec<u8>> {
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        read_record(&table, self.entity_type, id)
    }

    fn contains(&self, id: RecordId) -> RepoResult<bool> {
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        let key = encode_id(id);
        Ok(table.get(key.as_slice())?.is_some())
    }

    fn for_each<F>(&self, visit: F) -> RepoResult<()>
    where
        F: FnMut(RecordId, &[u8]) -> RepoResult<()>,
    {
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        walk_records(&table, self.entity_type.bucket(), visit)
    }

    fn lookup(&self, name: &str) -> RepoResult<RecordId> {
        let table = self
            .txn
            .open_table(bucket(name_bucket(self.entity_type)?))?;
        resolve_name(&table, self.entity_type, name)
    }

    fn count(&self) -> RepoResult<u64> {
        use redb::ReadableTableMetadata;
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        Ok(table.len()?)
    }
}

/// A read-write transaction over one entity type.
///
/// Nothing written here is visible to other transactions until the
/// enclosing [`ObjectStore::update`](crate::ObjectStore::update) commits.
pub struct WriteTx {
    txn: WriteTransaction,
    entity_type: EntityType,
}

impl WriteTx {
    pub(crate) fn new(txn: WriteTransaction, entity_type: EntityType) -> Self {
        Self { txn, entity_type }
    }

    pub(crate) fn into_inner(self) -> WriteTransaction {
        self.txn
    }

    /// Returns the next id of this type's durable sequence.
    ///
    /// The value is strictly greater than every id previously returned for
    /// the type. If the transaction aborts, the allocation is rolled back
    /// with it.
    pub fn allocate_id(&mut self) -> RepoResult<RecordId> {
        let bucket_name = self.entity_type.bucket();
        let mut sequences = self.txn.open_table(SEQUENCE_TABLE)?;
        let current = sequences.get(bucket_name)?.map_or(0, |guard| guard.value());
        let next = current
            .checked_add(1)
            .ok_or_else(|| RepoError::corrupted(SEQUENCE_BUCKET, "id sequence exhausted"))?;
        sequences.insert(bucket_name, next)?;
        Ok(RecordId::new(next))
    }

    /// Inserts or overwrites the record at `id`.
    pub fn put(&mut self, id: RecordId, payload: &[u8]) -> RepoResult<()> {
        let mut table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        let key = encode_id(id);
        table.insert(key.as_slice(), payload)?;
        Ok(())
    }

    /// Removes the record at `id`.
    ///
    /// Fails with `NotFound` if there was nothing to remove; the bucket is
    /// left unchanged in that case.
    pub fn delete(&mut self, id: RecordId) -> RepoResult<()> {
        let mut table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        let key = encode_id(id);
        let removed = table.remove(key.as_slice())?.is_some();
        if removed {
            Ok(())
        } else {
            Err(RepoError::not_found_id(self.entity_type, id))
        }
    }

    /// Maps `name` (case-insensitively) to `id`.
    ///
    /// Fails with `Duplicate` if the name already belongs to another record.
    /// Any other name `id` may already own is left in place; removing stale
    /// names is the caller's job.
    pub fn associate(&mut self, id: RecordId, name: &str) -> RepoResult<()> {
        let index_name = name_bucket(self.entity_type)?;
        let mut index = self.txn.open_table(bucket(index_name))?;
        let key = name_key(name);

        if let Some(existing) = index.get(key.as_bytes())? {
            let existing_id = decode_id(index_name, existing.value())?;
            if existing_id == id {
                return Ok(());
            }
            return Err(RepoError::Duplicate {
                entity_type: self.entity_type,
                existing_id,
                desired_name: name.to_string(),
            });
        }

        let value = encode_id(id);
        index.insert(key.as_bytes(), value.as_slice())?;
        Ok(())
    }

    /// Removes the mapping for `name`, if any.
    ///
    /// Removing a name that is not mapped is a no-op.
    pub fn unassociate(&mut self, name: &str) -> RepoResult<()> {
        let mut index = self
            .txn
            .open_table(bucket(name_bucket(self.entity_type)?))?;
        let key = name_key(name);
        index.remove(key.as_bytes())?;
        Ok(())
    }
}

impl Reader for WriteTx {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    fn get(&self, id: RecordId) -> RepoResult<Vec<u8>> {
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        read_record(&table, self.entity_type, id)
    }

    fn contains(&self, id: RecordId) -> RepoResult<bool> {
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        let key = encode_id(id);
        let found = table.get(key.as_slice())?.is_some();
        Ok(found)
    }

    fn for_each<F>(&self, visit: F) -> RepoResult<()>
    where
        F: FnMut(RecordId, &[u8]) -> RepoResult<()>,
    {
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        walk_records(&table, self.entity_type.bucket(), visit)
    }

    fn lookup(&self, name: &str) -> RepoResult<RecordId> {
        let table = self
            .txn
            .open_table(bucket(name_bucket(self.entity_type)?))?;
        resolve_name(&table, self.entity_type, name)
    }

    fn count(&self) -> RepoResult<u64> {
        use redb::ReadableTableMetadata;
        let table = self.txn.open_table(bucket(self.entity_type.bucket()))?;
        Ok(table.len()?)
    }
}
