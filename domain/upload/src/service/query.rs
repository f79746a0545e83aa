use async_trait::async_trait;
use uuid::Uuid;

use crate::exception::SessionResult;
use crate::model::vo::SessionDetail;

/// Read side: a session with its full part ledger, so clients can resume an
/// interrupted multipart upload from the unfilled rows.
#[async_trait]
pub trait SessionQueryService: Send + Sync {
    async fn detail(&self, session_id: Uuid) -> SessionResult<SessionDetail>;
}
