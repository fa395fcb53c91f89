//! # Adaptive Backoff
//!
//! The feedback loop between provider responses and request cadence.
//!
//! - `state`: the shared delay and last adjustment time
//! - `classify`: outcome → [`FailureClass`], plus reason extraction
//! - `policy`: [`FailureClass`] → delay adjustment and retry decision
//! - `controller`: ties the three together for each attempt

mod classify;
mod controller;
mod policy;
mod state;

pub use classify::{classify, extract_messages, AttemptOutcome, FailureClass};
pub use controller::{BackoffController, Observation, RequestLabels, RequestRecorder};
pub use policy::{CadencePolicy, CadenceRule, DelayAdjustment, RetryDecision};
pub use state::BackoffState;
