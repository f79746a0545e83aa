use std::time::Duration;

use async_trait::async_trait;

/// Cluster-wide mutual exclusion with try-lock semantics.
///
/// Used to serialize expiration processing per session across instances; any
/// primitive with non-blocking acquisition and a bounded hold time satisfies
/// this contract.
#[async_trait]
pub trait DistributedLockManager: Send + Sync {
    /// Attempt to take the lock, giving up after `wait` (zero means a single
    /// immediate attempt). The lock auto-releases after `hold` if the holder
    /// dies without unlocking.
    async fn try_lock(&self, key: &str, wait: Duration, hold: Duration) -> anyhow::Result<bool>;

    async fn unlock(&self, key: &str) -> anyhow::Result<()>;
}
