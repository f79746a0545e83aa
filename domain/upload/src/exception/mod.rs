use uuid::Uuid;

use crate::model::entity::SessionStatus;
use crate::model::vo::ETag;

pub type SessionResult<T> = Result<T, SessionException>;

#[derive(Debug, thiserror::Error)]
pub enum SessionException {
    #[error("Upload session {session_id} can't be found.")]
    SessionNotFound { session_id: Uuid },

    #[error("Upload session {session_id} doesn't have part number {part_number}.")]
    PartNotFound { session_id: Uuid, part_number: u32 },

    #[error("Can't {attempted} upload session {session_id} in status {from:?}.")]
    IllegalStateTransition {
        session_id: Uuid,
        from: SessionStatus,
        attempted: &'static str,
    },

    #[error("Upload session {session_id} is not a multipart session.")]
    NotMultipart { session_id: Uuid },

    #[error("Upload session {session_id} is not a single-upload session.")]
    NotSingle { session_id: Uuid },

    /// Non-destructive: the session stays ACTIVE so a corrected completion
    /// call can still succeed.
    #[error(
        "Session {session_id}'s store-verified etag {verified} doesn't match the client-reported etag {provided}."
    )]
    ETagMismatch {
        session_id: Uuid,
        provided: ETag,
        verified: ETag,
    },

    /// The upload never reached the store, as opposed to a checksum
    /// disagreement.
    #[error("No object at {bucket}/{s3_key} while completing session {session_id}.")]
    MissingObject {
        session_id: Uuid,
        bucket: String,
        s3_key: String,
    },

    #[error("Multipart session {session_id} has no completed parts to merge.")]
    NoCompletedParts { session_id: Uuid },

    /// A skip-and-retry-later signal, not a failure: another instance holds
    /// the session's expiration lock.
    #[error("Expiration lock for session {session_id} is held by another instance.")]
    LockContention { session_id: Uuid },

    #[error("Upload session internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for SessionException {
    fn from(e: anyhow::Error) -> Self {
        SessionException::InternalError { source: e }
    }
}
