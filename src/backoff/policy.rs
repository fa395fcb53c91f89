//! # Cadence Policy
//!
//! Maps each [`FailureClass`] to a delay adjustment and a retry decision.
//!
//! The default table:
//!
//! | Class         | Adjustment                                     | Decision |
//! |---------------|------------------------------------------------|----------|
//! | `Transport`   | hold                                           | retry    |
//! | `RateLimited` | +1s                                            | retry    |
//! | `Other`       | decay toward the floor (step 0 unless enabled) | retry    |
//!
//! With decay disabled the `Other` rule still refreshes the last adjustment
//! time once the interval elapsed, it just never lowers the delay.

use super::classify::FailureClass;
use crate::config::LauncherConfig;
use crate::constants::{
    DEFAULT_DELAY_DECAY_INTERVAL_SECS, DEFAULT_INITIAL_DELAY_SECS, RATE_LIMIT_DELAY_STEP_SECS,
};
use std::time::Duration;

/// Whether the provisioning call should make another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Stop,
}

/// How an outcome moves the delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayAdjustment {
    /// Leave the delay alone
    Hold,
    /// Add `step_secs` to the delay
    Increase { step_secs: u64 },
    /// When the delay is above `floor_secs` and at least `interval` passed
    /// since the last adjustment, subtract `step_secs` (never below the floor)
    /// and restart the interval.
    Decay {
        step_secs: u64,
        floor_secs: u64,
        interval: Duration,
    },
}

/// One row of the policy table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CadenceRule {
    pub adjustment: DelayAdjustment,
    pub decision: RetryDecision,
}

impl CadenceRule {
    #[must_use]
    pub const fn retry(adjustment: DelayAdjustment) -> Self {
        Self {
            adjustment,
            decision: RetryDecision::Retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadencePolicy {
    transport: CadenceRule,
    rate_limited: CadenceRule,
    other: CadenceRule,
}

impl Default for CadencePolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_INITIAL_DELAY_SECS,
            false,
            Duration::from_secs(DEFAULT_DELAY_DECAY_INTERVAL_SECS),
        )
    }
}

impl CadencePolicy {
    /// Build the always-retry table.
    ///
    /// `floor_secs` is the delay the decay never goes below (the initial
    /// delay). `decay_enabled` turns the `Other` rule's step from 0 into 1.
    #[must_use]
    pub fn new(floor_secs: u64, decay_enabled: bool, decay_interval: Duration) -> Self {
        Self {
            transport: CadenceRule::retry(DelayAdjustment::Hold),
            rate_limited: CadenceRule::retry(DelayAdjustment::Increase {
                step_secs: RATE_LIMIT_DELAY_STEP_SECS,
            }),
            other: CadenceRule::retry(DelayAdjustment::Decay {
                step_secs: u64::from(decay_enabled),
                floor_secs,
                interval: decay_interval,
            }),
        }
    }

    #[must_use]
    pub fn from_config(config: &LauncherConfig) -> Self {
        Self::new(
            config.initial_delay_secs,
            config.delay_decay_enabled,
            config.delay_decay_interval(),
        )
    }

    #[must_use]
    pub fn rule(&self, class: FailureClass) -> CadenceRule {
        match class {
            FailureClass::Transport => self.transport,
            FailureClass::RateLimited => self.rate_limited,
            FailureClass::Other => self.other,
        }
    }

    /// Replace the rule for one class
    #[must_use]
    pub fn with_rule(mut self, class: FailureClass, rule: CadenceRule) -> Self {
        match class {
            FailureClass::Transport => self.transport = rule,
            FailureClass::RateLimited => self.rate_limited = rule,
            FailureClass::Other => self.other = rule,
        }
        self
    }
}
