use std::sync::Arc;

use async_trait::async_trait;
use domain_upload::{
    exception::{SessionException, SessionResult},
    model::entity::{CompletedPart, UploadSession},
    model::vo::{CompletionEvidence, ETag},
    repository::{CompletedPartRepo, SessionRepo},
    service::{Clock, EventPublisher, ObjectStoreClient, UploadCompletionService},
};
use typed_builder::TypedBuilder;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(TypedBuilder)]
pub struct UploadCompletionServiceImpl {
    session_repo: Arc<dyn SessionRepo>,
    part_repo: Arc<dyn CompletedPartRepo>,
    object_store: Arc<dyn ObjectStoreClient>,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    #[builder(default = "upload-session-events".to_string())]
    event_topic: String,
}

impl UploadCompletionServiceImpl {
    async fn load(&self, session_id: Uuid) -> SessionResult<UploadSession> {
        self.session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionException::SessionNotFound { session_id })
    }

    /// The session is already persisted in its terminal state when this
    /// runs; a publish failure must not surface as an error for a completed
    /// session, so it is logged and the events are dropped.
    async fn publish_drained(&self, session: &mut UploadSession) {
        for event in session.poll_events() {
            if let Err(e) = self.event_publisher.publish(&event, &self.event_topic).await {
                warn!(session_id = %session.id, "failed to publish session event: {e}");
            }
        }
    }
}

#[async_trait]
impl UploadCompletionService for UploadCompletionServiceImpl {
    async fn complete_single(
        &self,
        session_id: Uuid,
        client_etag: ETag,
    ) -> SessionResult<UploadSession> {
        let mut session = self.load(session_id).await?;
        session.ensure_active("complete")?;
        if session.is_multipart() {
            return Err(SessionException::NotSingle { session_id });
        }

        let verified = self
            .object_store
            .get_object_etag(&session.bucket, &session.s3_key)
            .await?
            .ok_or_else(|| SessionException::MissingObject {
                session_id,
                bucket: session.bucket.clone(),
                s3_key: session.s3_key.clone(),
            })?;
        if verified != client_etag {
            // The session is left ACTIVE: a retry with the correct etag can
            // still complete it.
            return Err(SessionException::ETagMismatch {
                session_id,
                provided: client_etag,
                verified,
            });
        }

        session.complete(
            CompletionEvidence::Single {
                client_etag,
                verified_etag: verified,
            },
            self.clock.now(),
        )?;
        self.session_repo.save(&session).await?;
        self.publish_drained(&mut session).await;

        info!(session_id = %session.id, "completed single upload session");
        Ok(session)
    }

    async fn complete_multipart(&self, session_id: Uuid) -> SessionResult<UploadSession> {
        let mut session = self.load(session_id).await?;
        session.ensure_active("complete")?;
        let upload_id = session
            .upload_id()
            .ok_or(SessionException::NotMultipart { session_id })?
            .to_owned();

        // Read the ledger only after the state guard; the store's read
        // consistency decides which concurrently-arriving parts are seen.
        let mut uploaded: Vec<CompletedPart> = self
            .part_repo
            .find_all_by_session(session_id)
            .await?
            .into_iter()
            .filter(CompletedPart::is_uploaded)
            .collect();
        if uploaded.is_empty() {
            return Err(SessionException::NoCompletedParts { session_id });
        }
        // The store's merge call demands ascending part numbers, however the
        // parts arrived.
        uploaded.sort_by_key(|part| part.part_number);

        let merged_etag = self
            .object_store
            .complete_multipart(&session.bucket, &session.s3_key, &upload_id, &uploaded)
            .await?;

        session.complete(
            CompletionEvidence::Multipart {
                merged_etag,
                part_count: uploaded.len(),
            },
            self.clock.now(),
        )?;
        self.session_repo.save(&session).await?;
        self.publish_drained(&mut session).await;

        info!(
            session_id = %session.id,
            parts = uploaded.len(),
            "completed multipart upload session"
        );
        Ok(session)
    }

    async fn cancel(&self, session_id: Uuid) -> SessionResult<UploadSession> {
        let mut session = self.load(session_id).await?;
        session.ensure_active("fail")?;

        if let Some(upload_id) = session.upload_id().map(str::to_owned) {
            self.object_store
                .abort_multipart(&session.bucket, &session.s3_key, &upload_id)
                .await?;
        }
        session.fail(self.clock.now())?;
        self.session_repo.save(&session).await?;

        info!(session_id = %session.id, "cancelled upload session");
        Ok(session)
    }
}
