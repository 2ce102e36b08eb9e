//! Per-handler pulse watermark.
//!
//! The room pulse ticks at the shortest interval of any of its handlers;
//! every handler throttles itself against its own interval through a gate.

use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct PulseGate {
    interval: chrono::Duration,
    last_fired: Option<DateTime<Utc>>,
}

impl PulseGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: chrono::Duration::from_std(interval)
                .unwrap_or_else(|_| chrono::Duration::days(36_500)),
            last_fired: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval.to_std().unwrap_or_default()
    }

    pub fn last_fired(&self) -> Option<DateTime<Utc>> {
        self.last_fired
    }

    /// Returns `true` if the handler is due, and moves the watermark to `now`.
    pub fn check(&mut self, now: DateTime<Utc>) -> bool {
        let due = match self.last_fired {
            None => true,
            Some(last) => now >= last + self.interval,
        };
        if due {
            self.last_fired = Some(now);
        }
        due
    }
}
