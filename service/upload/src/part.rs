use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain_upload::{
    command::MarkPartUploadedCommand,
    exception::{SessionException, SessionResult},
    repository::{CompletedPartRepo, SessionRepo},
    service::{ObjectStoreClient, PartTrackingService},
};
use typed_builder::TypedBuilder;
use tracing::debug;
use uuid::Uuid;

#[derive(TypedBuilder)]
pub struct PartTrackingServiceImpl {
    session_repo: Arc<dyn SessionRepo>,
    part_repo: Arc<dyn CompletedPartRepo>,
    object_store: Arc<dyn ObjectStoreClient>,
    #[builder(default = Duration::from_secs(5 * 60))]
    presign_ttl: Duration,
}

#[async_trait]
impl PartTrackingService for PartTrackingServiceImpl {
    async fn mark_part_uploaded(&self, command: MarkPartUploadedCommand) -> SessionResult<()> {
        let session = self
            .session_repo
            .find_by_id(command.session_id)
            .await?
            .ok_or(SessionException::SessionNotFound {
                session_id: command.session_id,
            })?;
        session.ensure_part_reportable(command.part_number)?;

        // Only the part row is written: reports for different part numbers
        // of the same session never touch a shared record.
        let mut part = self
            .part_repo
            .find_by_session_and_part_number(command.session_id, command.part_number)
            .await?
            .ok_or(SessionException::PartNotFound {
                session_id: command.session_id,
                part_number: command.part_number,
            })?;
        part.mark_uploaded(command.etag, command.size_bytes);
        self.part_repo.save(&part).await?;

        debug!(
            session_id = %command.session_id,
            part_number = command.part_number,
            "recorded uploaded part"
        );
        Ok(())
    }

    async fn regenerate_part_url(
        &self,
        session_id: Uuid,
        part_number: u32,
    ) -> SessionResult<String> {
        let session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionException::SessionNotFound { session_id })?;
        session.ensure_part_reportable(part_number)?;
        let upload_id = session
            .upload_id()
            .ok_or(SessionException::NotMultipart { session_id })?
            .to_owned();

        let mut part = self
            .part_repo
            .find_by_session_and_part_number(session_id, part_number)
            .await?
            .ok_or(SessionException::PartNotFound {
                session_id,
                part_number,
            })?;
        let url = self
            .object_store
            .presign_part_url(
                &session.bucket,
                &session.s3_key,
                &upload_id,
                part_number,
                self.presign_ttl,
            )
            .await?;
        part.presigned_url = url.clone();
        self.part_repo.save(&part).await?;

        Ok(url)
    }
}
