//! # Constants
//!
//! Shared constants used throughout the launcher.
//!
//! Runtime values here are defaults and can be overridden via environment
//! variables (see [`crate::config::LauncherConfig`]). The launch shape values
//! are fixed.

/// Default HTTP server port for metrics and health checks
pub const DEFAULT_METRICS_PORT: u16 = 2223;

/// Starting delay between attempts (seconds). Also the floor the delay never
/// decays below.
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 31;

/// Minimum time between two downward adjustments of the delay (seconds)
pub const DEFAULT_DELAY_DECAY_INTERVAL_SECS: u64 = 300;

/// Attempts performed per provisioning call before the loop's own sleep.
/// Matches the provider SDK's default maximum attempt count.
pub const DEFAULT_ATTEMPTS_PER_CALL: u32 = 8;

/// HTTP status the provider uses to signal rate limiting
pub const RATE_LIMITED_STATUS: u16 = 429;

/// Amount the delay grows by on every rate-limited attempt (seconds)
pub const RATE_LIMIT_DELAY_STEP_SECS: u64 = 1;

/// OCPUs requested for the flexible shape
pub const INSTANCE_OCPUS: f32 = 4.0;

/// Memory requested for the flexible shape (GiB)
pub const INSTANCE_MEMORY_GBS: f32 = 24.0;

/// Compute API version path segment
pub const COMPUTE_API_VERSION: &str = "20160918";
