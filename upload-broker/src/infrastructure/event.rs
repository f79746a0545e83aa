use std::sync::Arc;

use domain_upload::{model::vo::SessionEvent, service::EventPublisher};
use redis::Cmd;
use typed_builder::TypedBuilder;

use crate::infrastructure::database::RedisClient;

/// List-backed outbox; downstream consumers drain the topic with BLPOP.
#[derive(TypedBuilder)]
pub struct RedisEventPublisher {
    client: Arc<RedisClient>,
}

#[async_trait::async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: &SessionEvent, topic: &str) -> anyhow::Result<()> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        connection.query::<()>(&Cmd::rpush(topic, serde_json::to_string(event)?))?;
        Ok(())
    }
}
