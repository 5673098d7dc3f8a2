use c9_repo::RecordId;
use serde::Serialize;

/// Listing entry for a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlobRef {
    /// Blob id.
    pub id: RecordId,
}

impl BlobRef {
    /// Path of the blob's content.
    #[must_use]
    pub fn location(&self) -> String {
        format!("/blob/{}", self.id)
    }
}
