//! # Backoff State
//!
//! The delay between attempts and the time of the last downward adjustment.
//!
//! One instance exists per process. The retry loop is its only writer; the
//! metrics handler reads it on every scrape. Both fields are atomics so the
//! reader never races the writer.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug)]
pub struct BackoffState {
    /// Current delay in whole seconds
    delay_secs: AtomicU64,
    /// Unix timestamp (milliseconds) of the last downward adjustment consideration
    last_adjustment_ms: AtomicI64,
}

impl BackoffState {
    /// Create the state at `initial_delay_secs`, with `now` as the last
    /// adjustment time.
    #[must_use]
    pub fn new(initial_delay_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            delay_secs: AtomicU64::new(initial_delay_secs),
            last_adjustment_ms: AtomicI64::new(now.timestamp_millis()),
        }
    }

    #[must_use]
    pub fn delay_secs(&self) -> u64 {
        self.delay_secs.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs())
    }

    #[must_use]
    pub fn last_adjustment(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp_millis(self.last_adjustment_ms.load(Ordering::Acquire))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Grow the delay by `step_secs`, saturating. Returns the new delay.
    pub(crate) fn increase(&self, step_secs: u64) -> u64 {
        let previous = self
            .delay_secs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |delay| {
                Some(delay.saturating_add(step_secs))
            })
            .unwrap_or_else(|current| current);
        previous.saturating_add(step_secs)
    }

    /// Shrink the delay by `step_secs` without going below `floor_secs`.
    /// A delay already at or below the floor is left untouched. Returns the
    /// new delay.
    pub(crate) fn decrease(&self, step_secs: u64, floor_secs: u64) -> u64 {
        let next = |delay: u64| {
            if delay <= floor_secs {
                delay
            } else {
                delay.saturating_sub(step_secs).max(floor_secs)
            }
        };
        let previous = self
            .delay_secs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |delay| Some(next(delay)))
            .unwrap_or_else(|current| current);
        next(previous)
    }

    pub(crate) fn mark_adjustment(&self, now: DateTime<Utc>) {
        self.last_adjustment_ms
            .store(now.timestamp_millis(), Ordering::Release);
    }
}
