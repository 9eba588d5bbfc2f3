use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::models::PoolStats;

/// Counters the pool itself does not expose: acquire waits and connections
/// recycled for idling or age.
///
/// The pool's reaper does the actual recycling and reports nothing, so closes
/// are derived from `opened - open`. Those the connection hooks catch first
/// are attributed exactly; the rest are reaper closes of idle connections.
#[derive(Debug)]
pub struct PoolMonitor {
    idle_timeout: Duration,
    max_lifetime: Duration,
    opened: AtomicU64,
    wait_count: AtomicU64,
    wait_nanos: AtomicU64,
    idle_closed: AtomicU64,
    lifetime_closed: AtomicU64,
}

impl PoolMonitor {
    pub fn new(idle_timeout: Duration, max_lifetime: Duration) -> Self {
        Self {
            idle_timeout,
            max_lifetime,
            opened: AtomicU64::new(0),
            wait_count: AtomicU64::new(0),
            wait_nanos: AtomicU64::new(0),
            idle_closed: AtomicU64::new(0),
            lifetime_closed: AtomicU64::new(0),
        }
    }

    pub fn record_open(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns false when a connection must be discarded instead of handed
    /// out or pooled again. Lifetime takes precedence over idle time.
    pub fn admit(&self, age: Duration, idle_for: Duration) -> bool {
        if age >= self.max_lifetime {
            self.lifetime_closed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if idle_for >= self.idle_timeout {
            self.idle_closed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn record_wait(&self, waited: Duration) {
        self.wait_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(waited.as_nanos()).unwrap_or(u64::MAX);
        self.wait_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn snapshot(&self, open: u32, idle: u32) -> PoolStats {
        let idle_closed = self.idle_closed.load(Ordering::Relaxed);
        let lifetime_closed = self.lifetime_closed.load(Ordering::Relaxed);
        let closed = self
            .opened
            .load(Ordering::Relaxed)
            .saturating_sub(u64::from(open));
        let reaped = closed.saturating_sub(idle_closed + lifetime_closed);

        PoolStats {
            open_connections: open,
            in_use: open.saturating_sub(idle),
            idle,
            wait_count: self.wait_count.load(Ordering::Relaxed),
            wait_duration: Duration::from_nanos(self.wait_nanos.load(Ordering::Relaxed)),
            max_idle_closed: idle_closed + reaped,
            max_lifetime_closed: lifetime_closed,
        }
    }
}
