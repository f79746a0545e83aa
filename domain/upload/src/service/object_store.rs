use std::time::Duration;

use async_trait::async_trait;

use crate::model::entity::CompletedPart;
use crate::model::vo::ETag;

/// Narrow port over the S3-compatible backend.
///
/// Request timeouts are the adapter's concern, configured on the underlying
/// client rather than passed per call.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Start a multipart upload, returning the store-assigned upload id.
    async fn initiate_multipart(&self, bucket: &str, s3_key: &str) -> anyhow::Result<String>;

    /// Presigned PUT URL for a single-upload session.
    async fn presign_put_url(
        &self,
        bucket: &str,
        s3_key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String>;

    /// Presigned upload URL for one part of a multipart upload.
    async fn presign_part_url(
        &self,
        bucket: &str,
        s3_key: &str,
        upload_id: &str,
        part_number: u32,
        expires_in: Duration,
    ) -> anyhow::Result<String>;

    /// Merge the uploaded parts server-side and return the merged etag.
    ///
    /// `parts` must be sorted ascending by part number; the store rejects
    /// unordered lists.
    async fn complete_multipart(
        &self,
        bucket: &str,
        s3_key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> anyhow::Result<ETag>;

    async fn abort_multipart(
        &self,
        bucket: &str,
        s3_key: &str,
        upload_id: &str,
    ) -> anyhow::Result<()>;

    /// Current etag of the object at `(bucket, s3_key)`, `None` when absent.
    async fn get_object_etag(&self, bucket: &str, s3_key: &str)
        -> anyhow::Result<Option<ETag>>;
}
