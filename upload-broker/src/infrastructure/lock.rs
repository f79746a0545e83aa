use std::sync::Arc;
use std::time::{Duration, Instant};

use domain_upload::service::DistributedLockManager;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::infrastructure::database::RedisClient;

/// Holder check before DEL so one instance can never release a lock another
/// instance re-acquired after this one's hold expired.
const UNLOCK_SCRIPT: &str = r#"if redis.call("get", KEYS[1]) == ARGV[1] then return redis.call("del", KEYS[1]) else return 0 end"#;

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// SET-NX based lock with a per-instance holder token and an expiry so a
/// crashed holder cannot wedge the key forever.
#[derive(TypedBuilder)]
pub struct RedisLockManager {
    client: Arc<RedisClient>,
    #[builder(default = Uuid::new_v4().to_string())]
    token: String,
}

impl RedisLockManager {
    fn acquire_once(&self, key: &str, hold: Duration) -> anyhow::Result<bool> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(key)
            .arg(&self.token)
            .arg("NX")
            .arg("PX")
            .arg(hold.as_millis() as u64);
        Ok(connection.query::<Option<String>>(&cmd)?.is_some())
    }
}

#[async_trait::async_trait]
impl DistributedLockManager for RedisLockManager {
    async fn try_lock(&self, key: &str, wait: Duration, hold: Duration) -> anyhow::Result<bool> {
        let deadline = Instant::now() + wait;
        loop {
            if self.acquire_once(key, hold)? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    async fn unlock(&self, key: &str) -> anyhow::Result<()> {
        let mut connection = self.client.get_connection()?;
        connection.check_open()?;
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(UNLOCK_SCRIPT).arg(1).arg(key).arg(&self.token);
        connection.query::<i64>(&cmd)?;
        Ok(())
    }
}
