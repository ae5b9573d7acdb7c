//! Service-time watermark
//!
//! The terminal stage publishes the largest timestamp it has seen. Readers
//! may block until the watermark passes a timestamp they need.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use querynode_core::Timestamp;

/// Monotonic timestamp shared between the pipeline and its readers
#[derive(Debug, Default)]
pub struct TSafe {
    ts: Mutex<Timestamp>,
    advanced: Condvar,
}

impl TSafe {
    /// Watermark starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current watermark.
    pub fn get(&self) -> Timestamp {
        *self.ts.lock()
    }

    /// Raise the watermark to `ts`. Lower values are ignored.
    pub fn set(&self, ts: Timestamp) -> bool {
        let mut current = self.ts.lock();
        if ts <= *current {
            return false;
        }
        *current = ts;
        drop(current);
        self.advanced.notify_all();
        true
    }

    /// Block until the watermark reaches `ts` or `timeout` elapses.
    ///
    /// A timeout too large to represent as a deadline waits without one.
    pub fn wait_for(&self, ts: Timestamp, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut current = self.ts.lock();
        while *current < ts {
            match deadline {
                Some(deadline) => {
                    if self.advanced.wait_until(&mut current, deadline).timed_out() {
                        return *current >= ts;
                    }
                }
                None => self.advanced.wait(&mut current),
            }
        }
        true
    }
}
