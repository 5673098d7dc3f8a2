//! Test fixtures and store helpers.

use c9_repo::{conditional, EntityType, ObjectStore, RecordId, RepoConfig, RepoError, Versioned};
use c9_server::{User, UserPatch};
use std::path::Path;
use tempfile::TempDir;

/// A store in a temporary directory, removed on drop.
pub struct TestStore {
    /// The store instance.
    pub store: ObjectStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestStore {
    /// Opens a fresh store with default configuration.
    pub fn new() -> Self {
        // Tests don't need fsync on every commit.
        Self::with_config(RepoConfig::new().sync_on_commit(false))
    }

    /// Opens a fresh store with the given configuration.
    pub fn with_config(config: RepoConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ObjectStore::open_with_config(temp_dir.path(), config)
            .expect("Failed to open store");
        Self { store, temp_dir }
    }

    /// Returns the repository directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Closes the store and opens it again from disk.
    pub fn reopen(self) -> Self {
        let Self { store, temp_dir } = self;
        let config = store.config().clone();
        store.close();
        let store = ObjectStore::open_with_config(temp_dir.path(), config)
            .expect("Failed to reopen store");
        Self { store, temp_dir }
    }

    /// Splits the fixture into its store and directory guard.
    pub fn into_parts(self) -> (ObjectStore, TempDir) {
        (self.store, self.temp_dir)
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = ObjectStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust,ignore
/// use c9_testkit::with_temp_store;
///
/// #[test]
/// fn my_test() {
///     with_temp_store(|store| {
///         // ... test operations
///     });
/// }
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&ObjectStore) -> R,
{
    let test_store = TestStore::new();
    f(&test_store.store)
}

/// Stores one blob and returns its id.
pub fn put_blob(store: &ObjectStore, payload: &[u8]) -> RecordId {
    store
        .update(EntityType::Blob, |tx| {
            let id = tx.allocate_id()?;
            tx.put(id, payload)?;
            Ok::<_, RepoError>(id)
        })
        .expect("Failed to store blob")
}

/// Creates a user with a derived e-mail address.
pub fn create_user(store: &ObjectStore, user_name: &str) -> Versioned<User> {
    let patch = UserPatch {
        user_name: Some(user_name.to_string()),
        email: Some(format!("{}@example.com", user_name.to_lowercase())),
        ..UserPatch::default()
    };
    conditional::create(store, &patch).expect("Failed to create user")
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// A store holding `count` blobs, with their ids in creation order.
    pub fn populated_blobs(count: usize) -> (TestStore, Vec<RecordId>) {
        let store = TestStore::new();
        let ids = (0..count)
            .map(|i| put_blob(&store, format!("blob-{i}").as_bytes()))
            .collect();
        (store, ids)
    }

    /// A store holding one user per name.
    pub fn with_users(names: &[&str]) -> TestStore {
        let store = TestStore::new();
        for name in names {
            create_user(&store, name);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c9_repo::{Reader, Target};

    #[test]
    fn temp_store_is_usable() {
        with_temp_store(|store| {
            let id = put_blob(store, b"hello");
            let bytes = store.view(EntityType::Blob, |tx| tx.get(id)).unwrap();
            assert_eq!(bytes, b"hello");
        });
    }

    #[test]
    fn reopen_keeps_data() {
        let store = TestStore::new();
        let id = put_blob(&store, b"persisted");
        let path = store.path().to_path_buf();

        let store = store.reopen();
        assert_eq!(store.path(), path);
        let bytes = store.view(EntityType::Blob, |tx| tx.get(id)).unwrap();
        assert_eq!(bytes, b"persisted");
    }

    #[test]
    fn populated_scenario() {
        let (store, ids) = scenarios::populated_blobs(5);
        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(store.view(EntityType::Blob, |tx| tx.count()).unwrap(), 5);
    }

    #[test]
    fn users_scenario() {
        let store = scenarios::with_users(&["alice", "Bob"]);
        let bob: Versioned<User> =
            conditional::fetch(&store, &Target::Name("bob".into())).unwrap();
        assert_eq!(bob.entity.email, "bob@example.com");
        assert_eq!(bob.entity.id, RecordId::new(2));
    }
}
