use async_trait::async_trait;
use uuid::Uuid;

use crate::command::MarkPartUploadedCommand;
use crate::exception::SessionResult;

/// # Part tracking service
///
/// Fills pre-allocated ledger placeholders as clients report their part
/// uploads. Designed for concurrent reports: each part row is independent
/// and no session-wide progress counter is computed (clients track their own
/// progress from the parts they submitted).
#[async_trait]
pub trait PartTrackingService: Send + Sync {
    /// Record etag and size for a part agreed at creation; part numbers
    /// outside the agreed range are rejected outright.
    async fn mark_part_uploaded(&self, command: MarkPartUploadedCommand) -> SessionResult<()>;

    /// Issue a fresh presigned URL for an agreed part, e.g. after the
    /// original URL expired mid-upload.
    async fn regenerate_part_url(
        &self,
        session_id: Uuid,
        part_number: u32,
    ) -> SessionResult<String>;
}
