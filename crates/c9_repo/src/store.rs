//! Object store facade.

use crate::config::RepoConfig;
use crate::dir::RepoDir;
use crate::error::{RepoError, RepoResult};
use crate::transaction::{bucket, ReadTx, WriteTx, SEQUENCE_TABLE};
use crate::types::{EntityType, RecordId};
use redb::{Database, ReadableTable, ReadableTableMetadata};
use std::path::Path;

/// Per-type counters reported by [`ObjectStore::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketStats {
    /// The entity type.
    pub entity_type: EntityType,
    /// Records in the primary bucket.
    pub records: u64,
    /// Entries in the name index, `None` for types without one.
    pub names: Option<u64>,
    /// Last id handed out by the type's sequence, zero if none yet.
    pub last_id: RecordId,
}

/// The object repository handle.
///
/// Owns the repository directory lock and the storage engine. Work happens
/// in closures passed to [`view`](Self::view) and [`update`](Self::update),
/// each of which runs inside one storage transaction scoped to one entity
/// type.
///
/// # Example
///
/// ```rust,ignore
/// use c9_repo::{EntityType, ObjectStore, Reader};
///
/// let store = ObjectStore::open(Path::new("/srv/c9"))?;
/// let id = store.update(EntityType::Blob, |tx| {
///     let id = tx.allocate_id()?;
///     tx.put(id, b"hello")?;
///     Ok::<_, c9_repo::RepoError>(id)
/// })?;
/// let bytes = store.view(EntityType::Blob, |tx| tx.get(id))?;
/// store.close();
/// ```
pub struct ObjectStore {
    config: RepoConfig,
    db: Database,
    dir: RepoDir,
}

impl ObjectStore {
    /// Opens the repository in `path` with default configuration.
    pub fn open(path: &Path) -> RepoResult<Self> {
        Self::open_with_config(path, RepoConfig::default())
    }

    /// Opens the repository in `path`.
    ///
    /// Locks the directory, opens or creates the store file and makes sure
    /// every bucket exists. Bucket creation is idempotent.
    ///
    /// # Errors
    ///
    /// - `Locked` if another handle owns the directory
    /// - `InvalidLayout` if the directory or store file is missing and
    ///   `create_if_missing` is off
    /// - `Storage` / `Io` if the store file can't be opened or initialized
    pub fn open_with_config(path: &Path, config: RepoConfig) -> RepoResult<Self> {
        let dir = RepoDir::open(path, config.create_if_missing)?;
        let db_path = dir.file_path(&config.db_file);

        let db = if db_path.exists() {
            redb::Builder::new()
                .set_cache_size(config.cache_size)
                .open(&db_path)?
        } else if config.create_if_missing {
            redb::Builder::new()
                .set_cache_size(config.cache_size)
                .create(&db_path)?
        } else {
            return Err(RepoError::invalid_layout(format!(
                "store file does not exist: {}",
                db_path.display()
            )));
        };

        Self::ensure_buckets(&db)?;
        tracing::debug!(path = %path.display(), "opened object store");

        Ok(Self { config, db, dir })
    }

    fn ensure_buckets(db: &Database) -> RepoResult<()> {
        let txn = db.begin_write()?;
        {
            for entity_type in EntityType::ALL {
                txn.open_table(bucket(entity_type.bucket()))?;
                if let Some(name_bucket) = entity_type.name_bucket() {
                    txn.open_table(bucket(name_bucket))?;
                }
            }
            txn.open_table(SEQUENCE_TABLE)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Runs `f` inside a read-only snapshot of `entity_type`'s buckets.
    ///
    /// The snapshot is released when `f` returns, whatever the outcome.
    pub fn view<F, T, E>(&self, entity_type: EntityType, f: F) -> Result<T, E>
    where
        F: FnOnce(&ReadTx) -> Result<T, E>,
        E: From<RepoError>,
    {
        let txn = self.db.begin_read().map_err(RepoError::from)?;
        let tx = ReadTx::new(txn, entity_type);
        f(&tx)
    }

    /// Runs `f` inside a read-write transaction over `entity_type`'s buckets.
    ///
    /// If `f` returns `Ok`, the transaction is committed before this returns
    /// and the commit is durable unless `sync_on_commit` is off. If `f`
    /// returns `Err`, the transaction is aborted and none of its writes
    /// become visible.
    ///
    /// Only one read-write transaction is active at a time; a second caller
    /// blocks until the first finishes.
    pub fn update<F, T, E>(&self, entity_type: EntityType, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut WriteTx) -> Result<T, E>,
        E: From<RepoError>,
    {
        let mut txn = self.db.begin_write().map_err(RepoError::from)?;
        txn.set_durability(self.config.durability());
        let mut tx = WriteTx::new(txn, entity_type);

        match f(&mut tx) {
            Ok(value) => {
                tx.into_inner().commit().map_err(RepoError::from)?;
                tracing::debug!(%entity_type, "committed update");
                Ok(value)
            }
            Err(err) => {
                if let Err(abort_err) = tx.into_inner().abort() {
                    tracing::warn!(%entity_type, error = %abort_err, "failed to abort update");
                } else {
                    tracing::debug!(%entity_type, "aborted update");
                }
                Err(err)
            }
        }
    }

    /// Reports record, name and sequence counters for every entity type.
    ///
    /// All counters come from the same snapshot.
    pub fn stats(&self) -> RepoResult<Vec<BucketStats>> {
        let txn = self.db.begin_read()?;
        let sequences = txn.open_table(SEQUENCE_TABLE)?;

        let mut stats = Vec::with_capacity(EntityType::ALL.len());
        for entity_type in EntityType::ALL {
            let records = txn.open_table(bucket(entity_type.bucket()))?.len()?;
            let names = match entity_type.name_bucket() {
                Some(name_bucket) => Some(txn.open_table(bucket(name_bucket))?.len()?),
                None => None,
            };
            let last_id = sequences
                .get(entity_type.bucket())?
                .map_or(0, |guard| guard.value());

            stats.push(BucketStats {
                entity_type,
                records,
                names,
                last_id: RecordId::new(last_id),
            });
        }
        Ok(stats)
    }

    /// Returns the repository directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Closes the store and releases the directory lock.
    ///
    /// Taking `self` by value means no transaction can still be running.
    pub fn close(self) {
        let Self { db, dir, .. } = self;
        drop(db);
        tracing::debug!(path = %dir.path().display(), "closed object store");
        drop(dir);
    }
}
