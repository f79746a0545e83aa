use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::vo::ETag;

/// One row of the per-session part ledger.
///
/// A placeholder row is written when the part's presigned URL is issued at
/// session creation, so the set of legal part numbers is fixed up front.
/// Reporting the part fills in etag and size; rows are independent of each
/// other so different part numbers can be reported concurrently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedPart {
    pub session_id: Uuid,
    /// 1-based part number agreed at session creation.
    pub part_number: u32,
    /// Presigned URL the client uploads this part's bytes with.
    pub presigned_url: String,
    /// Etag observed by the client for its part upload, unset until reported.
    pub etag: Option<ETag>,
    pub size_bytes: Option<u64>,
}

impl CompletedPart {
    pub fn placeholder(session_id: Uuid, part_number: u32, presigned_url: String) -> Self {
        Self {
            session_id,
            part_number,
            presigned_url,
            etag: None,
            size_bytes: None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.etag.is_some()
    }

    pub fn mark_uploaded(&mut self, etag: ETag, size_bytes: u64) {
        self.etag = Some(etag);
        self.size_bytes = Some(size_bytes);
    }
}
