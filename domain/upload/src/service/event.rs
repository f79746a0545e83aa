use async_trait::async_trait;

use crate::model::vo::SessionEvent;

/// Outbound publisher for drained session events.
///
/// Events are published after the aggregate persisted successfully;
/// downstream consumers are expected to handle at-least-once delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &SessionEvent, topic: &str) -> anyhow::Result<()>;
}
