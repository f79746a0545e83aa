use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::exception::{SessionException, SessionResult};
use crate::model::vo::{CompletionEvidence, ETag, SessionEvent};

/// Lifecycle status of an upload session.
///
/// `Completed`, `Failed` and `Expired` are terminal; no mutator accepts a
/// session in one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Active,
    Completed,
    Failed,
    Expired,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Expired)
    }
}

/// Variant-specific state of the two session kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SessionKind {
    /// One presigned PUT; the client reports the etag it observed and the
    /// store-verified etag is recorded next to it on completion.
    Single {
        idempotency_key: String,
        presigned_url: Option<String>,
        client_etag: Option<ETag>,
        verified_etag: Option<ETag>,
    },
    /// Store-coordinated multipart upload; the merged etag comes from the
    /// store's complete call, never from the client.
    Multipart {
        upload_id: String,
        expected_parts: u32,
        merged_etag: Option<ETag>,
    },
}

/// Upload session aggregate root.
///
/// Owns the state machine
/// `PENDING -[activate]-> ACTIVE -[complete]-> COMPLETED`,
/// `ACTIVE -[fail]-> FAILED`, `{PENDING, ACTIVE} -[expire]-> EXPIRED`.
/// Every mutator stamps `updated_at` from the caller-supplied instant so
/// transitions stay deterministic under an injected clock, and every illegal
/// transition is a hard error rather than a silent no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    pub id: Uuid,
    pub bucket: String,
    pub s3_key: String,
    pub status: SessionStatus,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Outbox of pending domain events, drained once per successful persist.
    #[serde(skip)]
    events: Vec<SessionEvent>,
}

impl UploadSession {
    pub fn new_single(
        bucket: String,
        s3_key: String,
        idempotency_key: String,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bucket,
            s3_key,
            status: SessionStatus::Pending,
            kind: SessionKind::Single {
                idempotency_key,
                presigned_url: None,
                client_etag: None,
                verified_etag: None,
            },
            created_at,
            updated_at: created_at,
            expires_at,
            events: vec![],
        }
    }

    pub fn new_multipart(
        bucket: String,
        s3_key: String,
        upload_id: String,
        expected_parts: u32,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bucket,
            s3_key,
            status: SessionStatus::Pending,
            kind: SessionKind::Multipart {
                upload_id,
                expected_parts,
                merged_etag: None,
            },
            created_at,
            updated_at: created_at,
            expires_at,
            events: vec![],
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.kind, SessionKind::Multipart { .. })
    }

    /// Store-assigned multipart upload id, `None` for single sessions.
    pub fn upload_id(&self) -> Option<&str> {
        match &self.kind {
            SessionKind::Multipart { upload_id, .. } => Some(upload_id),
            SessionKind::Single { .. } => None,
        }
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        match &self.kind {
            SessionKind::Single {
                idempotency_key, ..
            } => Some(idempotency_key),
            SessionKind::Multipart { .. } => None,
        }
    }

    pub fn presigned_url(&self) -> Option<&str> {
        match &self.kind {
            SessionKind::Single { presigned_url, .. } => presigned_url.as_deref(),
            SessionKind::Multipart { .. } => None,
        }
    }

    fn illegal(&self, attempted: &'static str) -> SessionException {
        SessionException::IllegalStateTransition {
            session_id: self.id,
            from: self.status,
            attempted,
        }
    }

    pub fn ensure_active(&self, attempted: &'static str) -> SessionResult<()> {
        if self.status != SessionStatus::Active {
            return Err(self.illegal(attempted));
        }
        Ok(())
    }

    /// Record the presigned PUT URL provisioned for a single-upload session.
    pub fn attach_presigned_url(&mut self, url: String) -> SessionResult<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("attach_presigned_url"));
        }
        match &mut self.kind {
            SessionKind::Single { presigned_url, .. } => {
                *presigned_url = Some(url);
                Ok(())
            }
            SessionKind::Multipart { .. } => Err(SessionException::InternalError {
                source: anyhow::anyhow!(
                    "a presigned PUT url only applies to single-upload sessions"
                ),
            }),
        }
    }

    /// `PENDING -> ACTIVE`, once object-store resources are provisioned.
    pub fn activate(&mut self, changed_at: DateTime<Utc>) -> SessionResult<()> {
        if self.status != SessionStatus::Pending {
            return Err(self.illegal("activate"));
        }
        self.status = SessionStatus::Active;
        self.updated_at = changed_at;
        Ok(())
    }

    /// `ACTIVE -> COMPLETED`, recording the store-observed etags and
    /// appending an `UploadCompleted` event.
    pub fn complete(
        &mut self,
        evidence: CompletionEvidence,
        changed_at: DateTime<Utc>,
    ) -> SessionResult<()> {
        self.ensure_active("complete")?;
        let etag = match (&mut self.kind, evidence) {
            (
                SessionKind::Single {
                    client_etag,
                    verified_etag,
                    ..
                },
                CompletionEvidence::Single {
                    client_etag: client,
                    verified_etag: verified,
                },
            ) => {
                *client_etag = Some(client);
                *verified_etag = Some(verified.clone());
                verified
            }
            (
                SessionKind::Multipart { merged_etag, .. },
                CompletionEvidence::Multipart {
                    merged_etag: merged,
                    part_count,
                },
            ) => {
                if part_count == 0 {
                    return Err(SessionException::NoCompletedParts {
                        session_id: self.id,
                    });
                }
                *merged_etag = Some(merged.clone());
                merged
            }
            (_, _) => {
                return Err(SessionException::InternalError {
                    source: anyhow::anyhow!(
                        "completion evidence kind doesn't match session {} kind",
                        self.id
                    ),
                })
            }
        };
        self.status = SessionStatus::Completed;
        self.updated_at = changed_at;
        self.events.push(SessionEvent::UploadCompleted {
            session_id: self.id,
            bucket: self.bucket.clone(),
            s3_key: self.s3_key.clone(),
            etag,
            completed_at: changed_at,
        });
        Ok(())
    }

    /// `ACTIVE -> FAILED`, the client-driven cancellation path.
    pub fn fail(&mut self, changed_at: DateTime<Utc>) -> SessionResult<()> {
        self.ensure_active("fail")?;
        self.status = SessionStatus::Failed;
        self.updated_at = changed_at;
        Ok(())
    }

    /// `{PENDING, ACTIVE} -> EXPIRED`, driven by the recovery sweep.
    pub fn expire(&mut self, changed_at: DateTime<Utc>) -> SessionResult<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("expire"));
        }
        self.status = SessionStatus::Expired;
        self.updated_at = changed_at;
        self.events.push(SessionEvent::SessionExpired {
            session_id: self.id,
            bucket: self.bucket.clone(),
            s3_key: self.s3_key.clone(),
            expired_at: changed_at,
        });
        Ok(())
    }

    /// Validate a part report against the session.
    ///
    /// The ledger row itself is written by the part store; the aggregate only
    /// enforces that the session is ACTIVE, multipart, and that the part
    /// number was agreed at creation. No session-wide progress counter is
    /// kept, so concurrent reports for different parts never contend here.
    pub fn ensure_part_reportable(&self, part_number: u32) -> SessionResult<()> {
        if self.status.is_terminal() {
            return Err(self.illegal("add_completed_part"));
        }
        self.ensure_active("add_completed_part")?;
        match &self.kind {
            SessionKind::Multipart { expected_parts, .. } => {
                if part_number == 0 || part_number > *expected_parts {
                    return Err(SessionException::PartNotFound {
                        session_id: self.id,
                        part_number,
                    });
                }
                Ok(())
            }
            SessionKind::Single { .. } => Err(SessionException::NotMultipart {
                session_id: self.id,
            }),
        }
    }

    /// Drain pending domain events; each event is returned exactly once.
    pub fn poll_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }
}
