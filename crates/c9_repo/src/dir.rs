//! Repository directory management.
//!
//! ```text
//! <repo_path>/
//! ├─ LOCK       # Advisory lock, one process per repository
//! └─ meta.db    # Store file holding every bucket
//! ```

use crate::error::{RepoError, RepoResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";

/// An opened repository directory.
///
/// Holds an exclusive lock on the directory for as long as it lives. The
/// lock is released when the value is dropped.
#[derive(Debug)]
pub struct RepoDir {
    path: PathBuf,
    _lock_file: File,
}

impl RepoDir {
    /// Opens or creates a repository directory and locks it.
    ///
    /// # Errors
    ///
    /// - `InvalidLayout` if the directory is missing and `create_if_missing`
    ///   is false, or the path is not a directory
    /// - `Locked` if another handle holds the directory
    /// - `Io` for file system failures
    pub fn open(path: &Path, create_if_missing: bool) -> RepoResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(RepoError::invalid_layout(format!(
                    "repository directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(RepoError::invalid_layout(format!(
                "path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(RepoError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the repository directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of a file inside the repository directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}
