use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::vo::ETag;

/// Request for a single-PUT upload session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSingleSessionCommand {
    /// Client-supplied token; retried requests with the same key replay the
    /// original session instead of creating a duplicate.
    pub idempotency_key: String,
    pub bucket: String,
    pub s3_key: String,
}

/// Request for a multipart upload session with a fixed part count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMultipartSessionCommand {
    pub bucket: String,
    pub s3_key: String,
    /// Number of parts agreed up front; one presigned URL and one ledger
    /// placeholder is provisioned per part.
    pub part_count: u32,
}

/// Client report that one part's bytes reached the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPartUploadedCommand {
    pub session_id: Uuid,
    pub part_number: u32,
    pub etag: ETag,
    pub size_bytes: u64,
}
