use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain_upload::{
    exception::{SessionException, SessionResult},
    model::vo::SweepReport,
    repository::SessionRepo,
    service::{
        Clock, DistributedLockManager, EventPublisher, ExpirationSweepService, ObjectStoreClient,
    },
};
use typed_builder::TypedBuilder;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(TypedBuilder)]
pub struct ExpirationSweepServiceImpl {
    session_repo: Arc<dyn SessionRepo>,
    object_store: Arc<dyn ObjectStoreClient>,
    lock_manager: Arc<dyn DistributedLockManager>,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    #[builder(default = "upload-session-events".to_string())]
    event_topic: String,
    #[builder(default = Duration::from_secs(30))]
    lock_hold: Duration,
}

fn lock_key(session_id: Uuid) -> String {
    format!("upload_session_lock_{session_id}")
}

#[async_trait]
impl ExpirationSweepService for ExpirationSweepServiceImpl {
    async fn run_sweep(&self, batch_size: usize) -> anyhow::Result<SweepReport> {
        let now = self.clock.now();
        let expired = self.session_repo.find_expired(now, batch_size).await?;
        let mut report = SweepReport {
            total: expired.len(),
            ..Default::default()
        };

        for session in expired {
            let session_id = session.id;
            match self.reclaim(session_id).await {
                Ok(()) => report.succeeded += 1,
                Err(SessionException::LockContention { .. }) => {
                    debug!(%session_id, "expiration lock busy, retrying next sweep");
                }
                Err(e) => {
                    // One session's failure must not abort the batch.
                    warn!(%session_id, "failed to reclaim expired session: {e}");
                    report.failed += 1;
                }
            }
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "expiration sweep finished"
        );
        Ok(report)
    }
}

impl ExpirationSweepServiceImpl {
    async fn reclaim(&self, session_id: Uuid) -> SessionResult<()> {
        let key = lock_key(session_id);
        if !self
            .lock_manager
            .try_lock(&key, Duration::ZERO, self.lock_hold)
            .await?
        {
            return Err(SessionException::LockContention { session_id });
        }
        let outcome = self.expire_locked(session_id).await;
        if let Err(e) = self.lock_manager.unlock(&key).await {
            warn!("failed to release expiration lock {key}: {e}");
        }
        outcome
    }

    async fn expire_locked(&self, session_id: Uuid) -> SessionResult<()> {
        // Reload under the lock: between the expired query and lock
        // acquisition another instance may already have reclaimed it.
        let mut session = self
            .session_repo
            .find_by_id(session_id)
            .await?
            .ok_or(SessionException::SessionNotFound { session_id })?;
        if session.status.is_terminal() {
            return Ok(());
        }

        if let Some(upload_id) = session.upload_id().map(str::to_owned) {
            // An abort failure leaves the session non-terminal, counted as an
            // item failure and retried on the next sweep.
            self.object_store
                .abort_multipart(&session.bucket, &session.s3_key, &upload_id)
                .await?;
        }

        session.expire(self.clock.now())?;
        self.session_repo.save(&session).await?;
        // The session is terminal and persisted; a publish failure is logged
        // rather than failing a reclamation that already happened.
        for event in session.poll_events() {
            if let Err(e) = self.event_publisher.publish(&event, &self.event_topic).await {
                warn!(%session_id, "failed to publish session event: {e}");
            }
        }
        Ok(())
    }
}
