use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::entity::{CompletedPart, UploadSession};

/// Object-store-assigned content identifier.
///
/// S3-style backends wrap etags in double quotes depending on the API that
/// returned them; values are unquoted on construction so comparison is
/// quote-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ETag(String);

impl ETag {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim_matches('"').to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof of completion handed to the aggregate.
///
/// Both variants carry etags observed from the object store, never values
/// fabricated client-side.
#[derive(Debug, Clone)]
pub enum CompletionEvidence {
    /// The client-reported etag together with the store-verified one; the
    /// caller has already checked they match.
    Single { client_etag: ETag, verified_etag: ETag },
    /// The merged etag returned by the store's complete-multipart call.
    Multipart { merged_etag: ETag, part_count: usize },
}

/// Domain event appended by terminal transitions and drained once per
/// successful persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum SessionEvent {
    UploadCompleted {
        session_id: Uuid,
        bucket: String,
        s3_key: String,
        etag: ETag,
        completed_at: DateTime<Utc>,
    },
    SessionExpired {
        session_id: Uuid,
        bucket: String,
        s3_key: String,
        expired_at: DateTime<Utc>,
    },
}

/// Outcome tally of one expiration sweep pass.
///
/// Sessions skipped because their lock was held elsewhere count towards
/// `total` only; they are retried on the next pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// A session together with its part ledger, parts ordered by part number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    pub session: UploadSession,
    pub parts: Vec<CompletedPart>,
}
