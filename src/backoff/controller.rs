//! # Backoff Controller
//!
//! Owns the delay feedback loop. After every attempt the controller:
//!
//! 1. records request metrics for the outcome
//! 2. classifies it and applies the matching [`CadencePolicy`] rule to the
//!    shared [`BackoffState`]
//! 3. sleeps for the resulting delay
//!
//! and hands the rule's [`RetryDecision`] back to the caller.

use super::classify::{classify, AttemptOutcome, FailureClass};
use super::policy::{CadencePolicy, DelayAdjustment, RetryDecision};
use super::state::BackoffState;
use crate::runtime::RunContext;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Labels of one `oci_requests_total` increment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestLabels {
    /// Attempt that got an HTTP response, by status
    Status(u16),
    /// Reason text: an extracted provider message, or the raw error of a
    /// transport failure
    Message(String),
}

/// Sink for request counter increments
pub trait RequestRecorder: Send + Sync {
    fn record_request(&self, labels: &RequestLabels);
}

/// What the controller decided for one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub class: FailureClass,
    pub decision: RetryDecision,
    /// Delay after the adjustment
    pub delay: Duration,
}

pub struct BackoffController {
    state: Arc<BackoffState>,
    policy: CadencePolicy,
    recorder: Arc<dyn RequestRecorder>,
}

impl fmt::Debug for BackoffController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackoffController")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BackoffController {
    #[must_use]
    pub fn new(
        state: Arc<BackoffState>,
        policy: CadencePolicy,
        recorder: Arc<dyn RequestRecorder>,
    ) -> Self {
        Self {
            state,
            policy,
            recorder,
        }
    }

    #[must_use]
    pub fn state(&self) -> &Arc<BackoffState> {
        &self.state
    }

    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.state.delay()
    }

    /// Record, classify and adjust for one outcome, without sleeping.
    pub fn observe(&self, outcome: &AttemptOutcome, now: DateTime<Utc>) -> Observation {
        self.record(outcome);

        let class = classify(outcome);
        let rule = self.policy.rule(class);
        self.adjust(rule.adjustment, now);

        let observation = Observation {
            class,
            decision: rule.decision,
            delay: self.state.delay(),
        };
        debug!(
            status = ?outcome.status_code,
            class = ?observation.class,
            delay_secs = observation.delay.as_secs(),
            "Attempt classified"
        );
        observation
    }

    /// [`observe`](Self::observe) the outcome, then sleep for the delay.
    ///
    /// The sleep ends early if `ctx` is stopped.
    pub async fn classify_and_wait(
        &self,
        outcome: &AttemptOutcome,
        ctx: &RunContext,
    ) -> RetryDecision {
        let observation = self.observe(outcome, Utc::now());
        ctx.sleep(observation.delay).await;
        observation.decision
    }

    fn record(&self, outcome: &AttemptOutcome) {
        match outcome.status_code {
            None => {
                self.recorder
                    .record_request(&RequestLabels::Message(outcome.error_message.clone()));
            }
            Some(status) => {
                self.recorder.record_request(&RequestLabels::Status(status));
                for message in outcome.extracted_messages() {
                    self.recorder
                        .record_request(&RequestLabels::Message(message));
                }
            }
        }
    }

    fn adjust(&self, adjustment: DelayAdjustment, now: DateTime<Utc>) {
        match adjustment {
            DelayAdjustment::Hold => {}
            DelayAdjustment::Increase { step_secs } => {
                self.state.increase(step_secs);
            }
            DelayAdjustment::Decay {
                step_secs,
                floor_secs,
                interval,
            } => {
                // A clock that went backwards counts as no time elapsed
                let elapsed = now
                    .signed_duration_since(self.state.last_adjustment())
                    .to_std()
                    .unwrap_or_default();
                if self.state.delay_secs() > floor_secs && elapsed >= interval {
                    if step_secs > 0 {
                        self.state.decrease(step_secs, floor_secs);
                    }
                    self.state.mark_adjustment(now);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingRecorder {
        labels: Mutex<Vec<RequestLabels>>,
    }

    impl CapturingRecorder {
        fn take(&self) -> Vec<RequestLabels> {
            std::mem::take(&mut *self.labels.lock().unwrap())
        }
    }

    impl RequestRecorder for CapturingRecorder {
        fn record_request(&self, labels: &RequestLabels) {
            self.labels.lock().unwrap().push(labels.clone());
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn controller_with(
        policy: CadencePolicy,
        initial_delay: u64,
    ) -> (BackoffController, Arc<CapturingRecorder>) {
        let recorder = Arc::new(CapturingRecorder::default());
        let controller = BackoffController::new(
            Arc::new(BackoffState::new(initial_delay, t0())),
            policy,
            Arc::clone(&recorder) as Arc<dyn RequestRecorder>,
        );
        (controller, recorder)
    }

    #[test]
    fn test_rate_limited_increases_delay_by_one() {
        let (controller, _) = controller_with(CadencePolicy::default(), 31);
        let observation = controller.observe(&AttemptOutcome::http(429, "slow down"), t0());

        assert_eq!(observation.class, FailureClass::RateLimited);
        assert_eq!(observation.decision, RetryDecision::Retry);
        assert_eq!(observation.delay, Duration::from_secs(32));
        assert_eq!(controller.state().delay_secs(), 32);
    }

    #[test]
    fn test_transport_failure_leaves_delay_and_records_raw_error() {
        let (controller, recorder) = controller_with(CadencePolicy::default(), 35);
        let observation = controller.observe(
            &AttemptOutcome::transport("error sending request: Message: not a reason."),
            t0(),
        );

        assert_eq!(observation.class, FailureClass::Transport);
        assert_eq!(controller.state().delay_secs(), 35);
        // Raw text only, no extraction for transport failures
        assert_eq!(
            recorder.take(),
            vec![RequestLabels::Message(
                "error sending request: Message: not a reason.".to_string()
            )]
        );
    }

    #[test]
    fn test_http_outcome_records_status_and_each_message() {
        let (controller, recorder) = controller_with(CadencePolicy::default(), 31);
        controller.observe(&AttemptOutcome::http(500, "Message: capacity issue."), t0());
        assert_eq!(
            recorder.take(),
            vec![
                RequestLabels::Status(500),
                RequestLabels::Message("capacity issue".to_string()),
            ]
        );

        controller.observe(
            &AttemptOutcome::http(400, "Message: first.\nMessage: second."),
            t0(),
        );
        assert_eq!(
            recorder.take(),
            vec![
                RequestLabels::Status(400),
                RequestLabels::Message("first".to_string()),
                RequestLabels::Message("second".to_string()),
            ]
        );
    }

    #[test]
    fn test_http_outcome_without_marker_records_status_only() {
        let (controller, recorder) = controller_with(CadencePolicy::default(), 31);
        controller.observe(&AttemptOutcome::http(502, "Bad Gateway"), t0());
        assert_eq!(recorder.take(), vec![RequestLabels::Status(502)]);
    }

    #[test]
    fn test_ten_rate_limited_attempts_end_at_41() {
        let (controller, recorder) = controller_with(CadencePolicy::default(), 31);
        for _ in 0..10 {
            controller.observe(&AttemptOutcome::http(429, ""), t0());
        }
        assert_eq!(controller.state().delay_secs(), 41);
        assert_eq!(recorder.take().len(), 10);
    }

    #[test]
    fn test_other_outcomes_never_lower_delay_by_default() {
        let (controller, _) = controller_with(CadencePolicy::default(), 31);
        for _ in 0..5 {
            controller.observe(&AttemptOutcome::http(429, ""), t0());
        }
        assert_eq!(controller.state().delay_secs(), 36);

        let later = t0() + chrono::Duration::minutes(6);
        controller.observe(&AttemptOutcome::success(200), later);
        controller.observe(&AttemptOutcome::http(500, ""), later + chrono::Duration::hours(1));

        assert_eq!(controller.state().delay_secs(), 36);
        // The adjustment time still moves
        assert_eq!(
            controller.state().last_adjustment(),
            later + chrono::Duration::hours(1)
        );
    }

    #[test]
    fn test_adjustment_time_untouched_at_floor() {
        let (controller, _) = controller_with(CadencePolicy::default(), 31);
        let later = t0() + chrono::Duration::minutes(10);
        controller.observe(&AttemptOutcome::http(500, ""), later);
        assert_eq!(controller.state().last_adjustment(), t0());
    }

    #[test]
    fn test_adjustment_time_untouched_before_interval() {
        let (controller, _) = controller_with(CadencePolicy::default(), 31);
        controller.observe(&AttemptOutcome::http(429, ""), t0());

        let early = t0() + chrono::Duration::minutes(4);
        controller.observe(&AttemptOutcome::http(500, ""), early);
        assert_eq!(controller.state().last_adjustment(), t0());
    }

    #[test]
    fn test_decay_when_enabled() {
        let policy = CadencePolicy::new(31, true, Duration::from_secs(300));
        let (controller, _) = controller_with(policy, 31);
        for _ in 0..3 {
            controller.observe(&AttemptOutcome::http(429, ""), t0());
        }
        assert_eq!(controller.state().delay_secs(), 34);

        // Within the interval: no decay
        controller.observe(&AttemptOutcome::success(200), t0() + chrono::Duration::minutes(1));
        assert_eq!(controller.state().delay_secs(), 34);

        let t1 = t0() + chrono::Duration::minutes(5);
        controller.observe(&AttemptOutcome::success(200), t1);
        assert_eq!(controller.state().delay_secs(), 33);

        // Interval restarts from t1
        controller.observe(&AttemptOutcome::success(200), t1 + chrono::Duration::minutes(3));
        assert_eq!(controller.state().delay_secs(), 33);

        let t2 = t1 + chrono::Duration::minutes(5);
        controller.observe(&AttemptOutcome::success(200), t2);
        let t3 = t2 + chrono::Duration::minutes(5);
        controller.observe(&AttemptOutcome::success(200), t3);
        assert_eq!(controller.state().delay_secs(), 31);

        // Never below the floor
        controller.observe(&AttemptOutcome::success(200), t3 + chrono::Duration::hours(2));
        assert_eq!(controller.state().delay_secs(), 31);
    }

    #[test]
    fn test_clock_going_backwards_is_not_elapsed_time() {
        let policy = CadencePolicy::new(31, true, Duration::from_secs(300));
        let (controller, _) = controller_with(policy, 40);
        controller.observe(&AttemptOutcome::success(200), t0() - chrono::Duration::hours(3));
        assert_eq!(controller.state().delay_secs(), 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_and_wait_sleeps_for_adjusted_delay() {
        let (controller, _) = controller_with(CadencePolicy::default(), 31);
        let ctx = RunContext::new();

        let start = tokio::time::Instant::now();
        let decision = controller
            .classify_and_wait(&AttemptOutcome::http(429, ""), &ctx)
            .await;

        assert_eq!(decision, RetryDecision::Retry);
        assert_eq!(start.elapsed(), Duration::from_secs(32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_and_wait_transport_sleeps_unchanged_delay() {
        let (controller, _) = controller_with(CadencePolicy::default(), 31);
        let ctx = RunContext::new();

        let start = tokio::time::Instant::now();
        controller
            .classify_and_wait(&AttemptOutcome::transport("connection refused"), &ctx)
            .await;
        assert_eq!(start.elapsed(), Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_classify_and_wait_still_adjusts_when_stopped() {
        let (controller, recorder) = controller_with(CadencePolicy::default(), 31);
        let ctx = RunContext::new();
        ctx.stop();

        let start = tokio::time::Instant::now();
        controller
            .classify_and_wait(&AttemptOutcome::http(429, ""), &ctx)
            .await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(controller.state().delay_secs(), 32);
        assert_eq!(recorder.take(), vec![RequestLabels::Status(429)]);
    }
}
