//! Inspect command implementation.

use crate::Format;
use c9_repo::{ObjectStore, RepoConfig, DEFAULT_DB_FILE};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Repository inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Repository path.
    pub path: String,
    /// Store file size in bytes.
    pub file_size: u64,
    /// Per-bucket statistics.
    pub buckets: Vec<BucketReport>,
}

/// Statistics for one entity type.
#[derive(Debug, Serialize)]
pub struct BucketReport {
    /// Primary bucket name.
    pub bucket: String,
    /// Number of records.
    pub records: u64,
    /// Number of name-index entries, absent for unnamed types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub names: Option<u64>,
    /// Last allocated id.
    pub last_id: u64,
}

/// Collects statistics from the repository in `path`.
///
/// Never creates a repository; the directory must already hold one.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let db_file = path.join(DEFAULT_DB_FILE);
    if !db_file.exists() {
        return Err(format!("No repository found at {}", path.display()).into());
    }

    tracing::debug!(path = %path.display(), "inspecting repository");
    let store = ObjectStore::open_with_config(path, RepoConfig::new().create_if_missing(false))?;
    let buckets = store
        .stats()?
        .into_iter()
        .map(|stats| BucketReport {
            bucket: stats.entity_type.bucket().to_string(),
            records: stats.records,
            names: stats.names,
            last_id: stats.last_id.as_u64(),
        })
        .collect();
    store.close();

    Ok(InspectResult {
        path: path.display().to_string(),
        file_size: std::fs::metadata(&db_file)?.len(),
        buckets,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => print!("{}", render_text(&result)),
    }
    Ok(())
}

fn render_text(result: &InspectResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "C9 Repository Inspection");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out);
    let _ = writeln!(out, "Path: {}", result.path);
    let _ = writeln!(out, "Size: {}", format_size(result.file_size));
    let _ = writeln!(out);
    let _ = writeln!(out, "Buckets:");
    for bucket in &result.buckets {
        let names = match bucket.names {
            Some(names) => format!("{names} names"),
            None => "no name index".to_string(),
        };
        let _ = writeln!(
            out,
            "  {:<6} {} records, {}, last id {}",
            bucket.bucket, bucket.records, names, bucket.last_id
        );
    }
    out
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c9_repo::{EntityType, RepoError};
    use tempfile::tempdir;

    #[test]
    fn missing_repository_is_an_error() {
        let temp = tempdir().unwrap();
        assert!(inspect(temp.path()).is_err());
        assert!(!temp.path().join(DEFAULT_DB_FILE).exists());
    }

    #[test]
    fn reports_counts() {
        let temp = tempdir().unwrap();
        let store = ObjectStore::open(temp.path()).unwrap();
        store
            .update(EntityType::Group, |tx| {
                let id = tx.allocate_id()?;
                tx.put(id, b"g")?;
                tx.associate(id, "ops")
            })
            .unwrap();
        store
            .update(EntityType::Blob, |tx| {
                tx.allocate_id()?;
                Ok::<_, RepoError>(())
            })
            .unwrap();
        store.close();

        let result = inspect(temp.path()).unwrap();
        assert_eq!(result.buckets.len(), 3);
        assert_eq!(result.buckets[0].bucket, "blob");
        assert_eq!(result.buckets[0].records, 0);
        assert_eq!(result.buckets[0].last_id, 1);
        assert_eq!(result.buckets[2].names, Some(1));

        let text = render_text(&result);
        assert!(text.contains("group  1 records, 1 names, last id 1"));
        assert!(text.contains("no name index"));

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["buckets"][0].get("names").is_none());
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
