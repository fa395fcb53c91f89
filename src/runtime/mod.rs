//! # Runtime
//!
//! - `context`: cooperative stop signal ([`RunContext`])
//! - `retry_loop`: the endless capacity-seeking loop ([`RetryLoop`])

mod context;
mod retry_loop;

pub use context::RunContext;
pub use retry_loop::{RetryLoop, RetryLoopStats};
