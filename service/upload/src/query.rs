use std::sync::Arc;

use async_trait::async_trait;
use domain_upload::{
    exception::{SessionException, SessionResult},
    model::vo::SessionDetail,
    repository::{CompletedPartRepo, SessionRepo},
    service::SessionQueryService,
};
use typed_builder::TypedBuilder;
use uuid::Uuid;

#[derive(TypedBuilder)]
pub struct SessionQueryServiceImpl {
    session_repo: Arc<dyn SessionRepo>,
    part_repo: Arc<dyn CompletedPartRepo>,
}

#[async_trait]
impl SessionQueryService for SessionQueryServiceImpl {
    async fn detail(&self, session_id: Uuid) -> SessionResult<SessionDetail> {
        let session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionException::SessionNotFound { session_id })?;
        let mut parts = self.part_repo.find_all_by_session(session_id).await?;
        parts.sort_by_key(|part| part.part_number);
        Ok(SessionDetail { session, parts })
    }
}
