use async_trait::async_trait;
use uuid::Uuid;

use crate::model::entity::CompletedPart;

/// Part ledger store, one independent row per `(session, part_number)`.
///
/// Rows for different part numbers of the same session may be written
/// concurrently; readers that assemble the full ledger (completion, detail
/// queries) must see every row written before their read began.
#[async_trait]
pub trait CompletedPartRepo: Send + Sync {
    async fn find_all_by_session(&self, session_id: Uuid)
        -> anyhow::Result<Vec<CompletedPart>>;

    async fn find_by_session_and_part_number(
        &self,
        session_id: Uuid,
        part_number: u32,
    ) -> anyhow::Result<Option<CompletedPart>>;

    async fn save(&self, part: &CompletedPart) -> anyhow::Result<()>;
}
