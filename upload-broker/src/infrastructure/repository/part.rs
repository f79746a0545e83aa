use std::collections::HashMap;
use std::sync::Arc;

use domain_upload::{model::entity::CompletedPart, repository::CompletedPartRepo};
use redis::Cmd;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::infrastructure::database::RedisClient;

/// One hash per session, field per part number. The ledger lives and dies
/// with the session key rather than being scattered over the keyspace.
fn ledger_key(session_id: Uuid) -> String {
    format!("upload_parts_{session_id}")
}

#[derive(TypedBuilder)]
pub struct RedisPartRepo {
    client: Arc<RedisClient>,
}

#[async_trait::async_trait]
impl CompletedPartRepo for RedisPartRepo {
    async fn find_all_by_session(&self, session_id: Uuid) -> anyhow::Result<Vec<CompletedPart>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let rows =
            connection.query::<HashMap<String, String>>(&Cmd::hgetall(ledger_key(session_id)))?;
        let mut parts = Vec::with_capacity(rows.len());
        for json in rows.into_values() {
            parts.push(serde_json::from_str(&json)?);
        }
        Ok(parts)
    }

    async fn find_by_session_and_part_number(
        &self,
        session_id: Uuid,
        part_number: u32,
    ) -> anyhow::Result<Option<CompletedPart>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let raw = connection.query::<Option<String>>(&Cmd::hget(
            ledger_key(session_id),
            part_number.to_string(),
        ))?;
        Ok(match raw {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }

    async fn save(&self, part: &CompletedPart) -> anyhow::Result<()> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        connection.query::<()>(&Cmd::hset(
            ledger_key(part.session_id),
            part.part_number.to_string(),
            serde_json::to_string(part)?,
        ))?;
        Ok(())
    }
}
