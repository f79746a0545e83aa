use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::entity::UploadSession;

/// Persistence boundary for the session aggregate.
///
/// `save` is a whole-aggregate upsert; per-session write serialization is
/// the store's job (optimistic concurrency), invariant checks happen on the
/// loaded snapshot before save.
#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UploadSession>>;

    async fn find_by_idempotency_key(&self, key: &str)
        -> anyhow::Result<Option<UploadSession>>;

    /// First persist of a freshly-created session.
    ///
    /// When the session carries an idempotency key, the key is claimed
    /// atomically: exactly one of any number of concurrent inserts with the
    /// same key stores its session and gets `None` back, every other caller
    /// gets the winning session and must treat the request as a replay.
    async fn insert(&self, session: &UploadSession) -> anyhow::Result<Option<UploadSession>>;

    /// Whole-aggregate upsert for a session that `insert` already stored.
    async fn save(&self, session: &UploadSession) -> anyhow::Result<()>;

    /// Non-terminal sessions whose `expires_at` lies before `now`, at most
    /// `limit` of them.
    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<UploadSession>>;
}
