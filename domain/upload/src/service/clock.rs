use chrono::{DateTime, Utc};

/// Injectable time source.
///
/// Services never read the wall clock directly; expiration and transition
/// timestamps stay deterministic under test by swapping this port.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside tests.
pub struct UtcClock;

impl Clock for UtcClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
