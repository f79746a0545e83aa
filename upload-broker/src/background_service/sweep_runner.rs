use std::sync::Arc;
use std::time::Duration;

use domain_upload::service::ExpirationSweepService;
use tokio::time::interval;
use tracing::Instrument;

/// Periodic reclamation of overdue sessions. Every broker instance runs one
/// of these; the per-session lock keeps concurrent passes from colliding.
pub struct SweepRunner {
    service: Arc<dyn ExpirationSweepService>,
    interval: Duration,
    batch_size: usize,
}

impl SweepRunner {
    pub fn new(
        interval: u64,
        batch_size: usize,
        service: Arc<dyn ExpirationSweepService>,
    ) -> Self {
        Self {
            service,
            interval: Duration::from_secs(interval),
            batch_size,
        }
    }

    pub async fn run(&self) {
        let mut interval = interval(self.interval);
        loop {
            interval.tick().await;
            match self
                .service
                .run_sweep(self.batch_size)
                .instrument(tracing::trace_span!("sweep"))
                .await
            {
                Ok(report) if report.total > 0 => {
                    tracing::info!(
                        "Swept {} of {} expired sessions ({} failed).",
                        report.succeeded,
                        report.total,
                        report.failed
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Sweep pass failed: {e}"),
            }
        }
    }
}
