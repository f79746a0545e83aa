use async_trait::async_trait;
use uuid::Uuid;

use crate::exception::SessionResult;
use crate::model::entity::UploadSession;
use crate::model::vo::ETag;

/// # Upload completion service
///
/// Validates completion evidence against the object store's authoritative
/// state before the aggregate transitions. Validation failures are
/// non-destructive: the session stays ACTIVE and the call can be retried
/// with correct evidence.
#[async_trait]
pub trait UploadCompletionService: Send + Sync {
    /// Compare the client-reported etag against the store's etag for the
    /// session key. Absent object is `MissingObject`, a differing etag is
    /// `ETagMismatch`; only a match completes the session.
    async fn complete_single(
        &self,
        session_id: Uuid,
        client_etag: ETag,
    ) -> SessionResult<UploadSession>;

    /// Submit the recorded part ledger, sorted ascending by part number, to
    /// the store's complete call and record the merged etag it returns.
    /// Rejected before any network call when no part has been reported.
    async fn complete_multipart(&self, session_id: Uuid) -> SessionResult<UploadSession>;

    /// Client-driven cancellation; aborts the store-side multipart upload
    /// when one is in flight.
    async fn cancel(&self, session_id: Uuid) -> SessionResult<UploadSession>;
}
