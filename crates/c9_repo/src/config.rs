//! Repository configuration.

/// Default name of the store file inside the repository directory.
pub const DEFAULT_DB_FILE: &str = "meta.db";

/// Configuration for opening a repository.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Whether to create the directory and store file if they don't exist.
    pub create_if_missing: bool,

    /// Whether every commit is flushed to disk before `update` returns.
    ///
    /// Disabling this trades crash durability of the latest commits for
    /// write throughput.
    pub sync_on_commit: bool,

    /// Page cache size handed to the storage engine, in bytes.
    pub cache_size: usize,

    /// File name of the store inside the repository directory.
    pub db_file: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            cache_size: 64 * 1024 * 1024, // 64 MB
            db_file: DEFAULT_DB_FILE.to_string(),
        }
    }
}

impl RepoConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the repository if missing.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether commits are flushed before returning.
    #[must_use]
    pub fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the storage engine cache size.
    #[must_use]
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = bytes;
        self
    }

    /// Sets the store file name.
    #[must_use]
    pub fn db_file(mut self, name: impl Into<String>) -> Self {
        self.db_file = name.into();
        self
    }

    pub(crate) fn durability(&self) -> redb::Durability {
        if self.sync_on_commit {
            redb::Durability::Immediate
        } else {
            redb::Durability::Eventual
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RepoConfig::default();
        assert!(config.create_if_missing);
        assert!(config.sync_on_commit);
        assert_eq!(config.db_file, "meta.db");
    }

    #[test]
    fn builder_pattern() {
        let config = RepoConfig::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .cache_size(1024)
            .db_file("other.db");

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.cache_size, 1024);
        assert_eq!(config.db_file, "other.db");
        assert!(matches!(config.durability(), redb::Durability::Eventual));
    }
}
