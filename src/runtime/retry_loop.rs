//! # Retry Loop
//!
//! Keeps asking the provider for an instance until the process is stopped.
//!
//! Each iteration is one *call* of up to `attempts_per_call` attempts. Every
//! attempt, successful or not, goes through
//! [`BackoffController::classify_and_wait`]. After the call the loop waits
//! once more for the current delay and starts the next call. There is no
//! exit condition other than the [`RunContext`] being stopped.

use super::context::RunContext;
use crate::backoff::{AttemptOutcome, BackoffController, RetryDecision};
use crate::observability::metrics;
use crate::provider::{InstanceLauncher, LaunchInstanceDetails};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Counters returned when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryLoopStats {
    /// Calls started
    pub calls: u64,
    /// Attempts made across all calls
    pub attempts: u64,
}

pub struct RetryLoop {
    launcher: Arc<dyn InstanceLauncher>,
    controller: BackoffController,
    details: LaunchInstanceDetails,
    attempts_per_call: u32,
}

impl fmt::Debug for RetryLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryLoop")
            .field("controller", &self.controller)
            .field("attempts_per_call", &self.attempts_per_call)
            .finish_non_exhaustive()
    }
}

impl RetryLoop {
    /// `attempts_per_call` is raised to 1 if zero.
    #[must_use]
    pub fn new(
        launcher: Arc<dyn InstanceLauncher>,
        controller: BackoffController,
        details: LaunchInstanceDetails,
        attempts_per_call: u32,
    ) -> Self {
        Self {
            launcher,
            controller,
            details,
            attempts_per_call: attempts_per_call.max(1),
        }
    }

    #[must_use]
    pub fn controller(&self) -> &BackoffController {
        &self.controller
    }

    /// Run until `ctx` is stopped.
    pub async fn run(&self, ctx: &RunContext) -> RetryLoopStats {
        let mut stats = RetryLoopStats::default();
        info!(
            attempts_per_call = self.attempts_per_call,
            delay_secs = self.controller.current_delay().as_secs(),
            "Starting launch retry loop"
        );

        while !ctx.is_stopped() {
            stats.calls += 1;
            metrics::increment_launch_calls();
            stats.attempts += self.call(ctx, stats.calls).await;

            if ctx.is_stopped() {
                break;
            }
            let delay = self.controller.current_delay();
            debug!(call = stats.calls, delay_secs = delay.as_secs(), "Call finished, waiting");
            ctx.sleep(delay).await;
        }

        info!(
            calls = stats.calls,
            attempts = stats.attempts,
            "Launch retry loop stopped"
        );
        stats
    }

    /// One call: attempts until the budget is spent, the policy says stop,
    /// or `ctx` is stopped. Returns the number of attempts made.
    async fn call(&self, ctx: &RunContext, call: u64) -> u64 {
        let mut attempts = 0;
        for attempt in 1..=self.attempts_per_call {
            let result = self.launcher.launch_instance(&self.details).await;
            attempts += 1;

            match &result {
                Ok(instance) => {
                    metrics::increment_instances_launched();
                    info!(
                        call,
                        attempt,
                        status = instance.status,
                        instance_id = instance.id.as_deref().unwrap_or("unknown"),
                        lifecycle_state = instance.lifecycle_state.as_deref().unwrap_or("unknown"),
                        "Instance launch accepted"
                    );
                }
                Err(e) => {
                    debug!(call, attempt, status = ?e.status(), error = %e, "Launch attempt failed");
                }
            }

            let outcome = AttemptOutcome::from(&result);
            let decision = self.controller.classify_and_wait(&outcome, ctx).await;
            if decision == RetryDecision::Stop || ctx.is_stopped() {
                break;
            }
        }
        attempts
    }
}
