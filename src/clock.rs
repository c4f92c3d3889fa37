//! Server clock estimate.
//!
//! Holds the process-wide best guess of the server's current time, fed by the
//! clock synchronization interceptor. Created once by the transport builder
//! and shared by handle; it needs no teardown.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy)]
struct Sample {
    /// Corrected server time
    estimate: DateTime<Utc>,
    /// Local wall clock when the estimate was accepted
    observed_at: DateTime<Utc>,
}

/// Corrected server time, updated from response `Date` headers.
///
/// Updates are compared by timestamp, not by arrival order: an estimate older
/// than the one already held is discarded, because response completion order
/// does not match request start order.
#[derive(Debug, Default)]
pub struct ServerClock {
    sample: Mutex<Option<Sample>>,
}

impl ServerClock {
    /// Creates a clock with no estimate yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a new estimate if it is not older than the current one.
    ///
    /// Returns `true` if the estimate was accepted.
    pub fn update(&self, estimate: DateTime<Utc>) -> bool {
        let mut sample = self.sample.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(current) = *sample {
            if estimate < current.estimate {
                log::debug!(
                    "Discarding stale server time {estimate} (holding {})",
                    current.estimate
                );
                return false;
            }
        }

        *sample = Some(Sample {
            estimate,
            observed_at: Utc::now(),
        });
        true
    }

    /// The most recent accepted estimate, if any.
    pub fn estimate(&self) -> Option<DateTime<Utc>> {
        self.sample
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|s| s.estimate)
    }

    /// Difference between server time and local time at the last accepted
    /// estimate; zero until the first estimate arrives.
    pub fn offset(&self) -> Duration {
        self.sample
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .map(|s| s.estimate - s.observed_at)
            .unwrap_or_else(Duration::zero)
    }

    /// Local time corrected by [`ServerClock::offset`].
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.offset()
    }
}
