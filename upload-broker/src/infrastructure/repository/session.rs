use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use domain_upload::{model::entity::UploadSession, repository::SessionRepo};
use redis::Cmd;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::infrastructure::database::RedisClient;

/// Sorted set indexing non-terminal sessions by their expiry timestamp, so
/// the sweep can range-scan overdue sessions without touching every record.
const EXPIRY_INDEX: &str = "upload_session_expiry";

fn session_key(id: Uuid) -> String {
    format!("upload_session_{id}")
}

fn idempotency_key(key: &str) -> String {
    format!("upload_idem_{key}")
}

#[derive(TypedBuilder)]
pub struct RedisSessionRepo {
    client: Arc<RedisClient>,
}

impl RedisSessionRepo {
    fn load(
        &self,
        connection: &mut crate::infrastructure::database::RedisConnection,
        id: Uuid,
    ) -> anyhow::Result<Option<UploadSession>> {
        let raw = connection.query::<Option<String>>(&Cmd::get(session_key(id)))?;
        Ok(match raw {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        })
    }
}

#[async_trait::async_trait]
impl SessionRepo for RedisSessionRepo {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<UploadSession>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        self.load(&mut connection, id)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<UploadSession>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let id = connection.query::<Option<String>>(&Cmd::get(idempotency_key(key)))?;
        Ok(match id {
            Some(id) => self.load(&mut connection, Uuid::parse_str(&id)?)?,
            None => None,
        })
    }

    async fn insert(&self, session: &UploadSession) -> anyhow::Result<Option<UploadSession>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        // Record before pointer, so a pointer never references a missing
        // session.
        connection.query::<()>(&Cmd::set(
            session_key(session.id),
            serde_json::to_string(session)?,
        ))?;
        if let Some(key) = session.idempotency_key() {
            let mut claim = redis::cmd("SET");
            claim.arg(idempotency_key(key)).arg(session.id.to_string()).arg("NX");
            let claimed = connection.query::<Option<String>>(&claim)?.is_some();
            if !claimed {
                // Lost the claim: another insert with the same key got there
                // first. Drop our record and hand back the winner.
                connection.query::<()>(&Cmd::del(session_key(session.id)))?;
                let winner_id = connection
                    .query::<Option<String>>(&Cmd::get(idempotency_key(key)))?
                    .context("idempotency pointer vanished during claim")?;
                let winner = self
                    .load(&mut connection, Uuid::parse_str(&winner_id)?)?
                    .context("idempotency pointer references a missing session")?;
                return Ok(Some(winner));
            }
        }
        connection.query::<()>(&Cmd::zadd(
            EXPIRY_INDEX,
            session.id.to_string(),
            session.expires_at.timestamp(),
        ))?;
        Ok(None)
    }

    async fn save(&self, session: &UploadSession) -> anyhow::Result<()> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        connection.query::<()>(&Cmd::set(
            session_key(session.id),
            serde_json::to_string(session)?,
        ))?;
        if session.status.is_terminal() {
            connection.query::<()>(&Cmd::zrem(EXPIRY_INDEX, session.id.to_string()))?;
        } else {
            connection.query::<()>(&Cmd::zadd(
                EXPIRY_INDEX,
                session.id.to_string(),
                session.expires_at.timestamp(),
            ))?;
        }
        Ok(())
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> anyhow::Result<Vec<UploadSession>> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let ids = connection.query::<Vec<String>>(&Cmd::zrangebyscore_limit(
            EXPIRY_INDEX,
            "-inf",
            now.timestamp(),
            0,
            limit as isize,
        ))?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(&mut connection, Uuid::parse_str(&id)?)? {
                Some(session) if !session.status.is_terminal() => sessions.push(session),
                // stale index entry, drop it so the next scan stays clean
                _ => {
                    connection.query::<()>(&Cmd::zrem(EXPIRY_INDEX, &id))?;
                }
            }
        }
        Ok(sessions)
    }
}
