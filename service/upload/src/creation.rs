use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain_upload::{
    command::{CreateMultipartSessionCommand, CreateSingleSessionCommand},
    exception::{SessionException, SessionResult},
    model::entity::{CompletedPart, UploadSession},
    repository::{CompletedPartRepo, SessionRepo},
    service::{Clock, ObjectStoreClient, SessionCreationService},
};
use typed_builder::TypedBuilder;
use tracing::info;

#[derive(TypedBuilder)]
pub struct SessionCreationServiceImpl {
    session_repo: Arc<dyn SessionRepo>,
    part_repo: Arc<dyn CompletedPartRepo>,
    object_store: Arc<dyn ObjectStoreClient>,
    clock: Arc<dyn Clock>,
    #[builder(default = Duration::from_secs(60 * 60))]
    session_ttl: Duration,
    #[builder(default = Duration::from_secs(5 * 60))]
    presign_ttl: Duration,
}

impl SessionCreationServiceImpl {
    fn expiry_window(&self) -> SessionResult<chrono::Duration> {
        chrono::Duration::from_std(self.session_ttl)
            .map_err(|e| SessionException::InternalError { source: e.into() })
    }
}

#[async_trait]
impl SessionCreationService for SessionCreationServiceImpl {
    async fn create_single(
        &self,
        command: CreateSingleSessionCommand,
    ) -> SessionResult<UploadSession> {
        if let Some(existing) = self
            .session_repo
            .find_by_idempotency_key(&command.idempotency_key)
            .await?
        {
            info!(
                session_id = %existing.id,
                idempotency_key = %command.idempotency_key,
                "replaying session creation for known idempotency key"
            );
            return Ok(existing);
        }

        let now = self.clock.now();
        let mut session = UploadSession::new_single(
            command.bucket,
            command.s3_key,
            command.idempotency_key,
            now,
            now + self.expiry_window()?,
        );
        // Durability boundary: the PENDING record must exist before any
        // presigned URL leaves this process. The insert also claims the
        // idempotency key, so two creations racing past the lookup above
        // still settle on one session.
        if let Some(winner) = self.session_repo.insert(&session).await? {
            info!(
                session_id = %winner.id,
                "replaying session creation, idempotency key claimed concurrently"
            );
            return Ok(winner);
        }

        let url = self
            .object_store
            .presign_put_url(&session.bucket, &session.s3_key, self.presign_ttl)
            .await?;
        session.attach_presigned_url(url)?;
        session.activate(self.clock.now())?;
        self.session_repo.save(&session).await?;

        info!(session_id = %session.id, bucket = %session.bucket, "created single upload session");
        Ok(session)
    }

    async fn create_multipart(
        &self,
        command: CreateMultipartSessionCommand,
    ) -> SessionResult<UploadSession> {
        if command.part_count == 0 {
            return Err(SessionException::InternalError {
                source: anyhow::anyhow!("a multipart session needs at least one part"),
            });
        }

        let upload_id = self
            .object_store
            .initiate_multipart(&command.bucket, &command.s3_key)
            .await?;

        let now = self.clock.now();
        let mut session = UploadSession::new_multipart(
            command.bucket,
            command.s3_key,
            upload_id.clone(),
            command.part_count,
            now,
            now + self.expiry_window()?,
        );
        // Persist before provisioning URLs: if anything below fails, the
        // record already exists and the sweep reclaims the store-side upload
        // once the session expires.
        self.session_repo.insert(&session).await?;

        for part_number in 1..=command.part_count {
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
            self.part_repo
                .save(&CompletedPart::placeholder(session.id, part_number, url))
                .await?;
        }

        session.activate(self.clock.now())?;
        self.session_repo.save(&session).await?;

        info!(
            session_id = %session.id,
            bucket = %session.bucket,
            parts = command.part_count,
            "created multipart upload session"
        );
        Ok(session)
    }
}
