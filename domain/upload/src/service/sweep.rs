use async_trait::async_trait;

use crate::model::vo::SweepReport;

/// # Expiration and recovery sweep
///
/// Reclaims non-terminal sessions past their expiry: under a per-session
/// distributed lock, aborts any in-flight store-side multipart upload, then
/// expires the aggregate. Any number of instances may run the sweep
/// concurrently; a session whose lock is busy is skipped silently and
/// retried on the next pass.
#[async_trait]
pub trait ExpirationSweepService: Send + Sync {
    /// One reclamation pass over at most `batch_size` sessions. Individual
    /// failures are absorbed into the tally; the pass itself only errors
    /// when the expired-session query does.
    async fn run_sweep(&self, batch_size: usize) -> anyhow::Result<SweepReport>;
}
