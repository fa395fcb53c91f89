//! # Configuration
//!
//! Configuration is read once at startup from environment variables.
//!
//! - [`LaunchConfig`]: what to launch and the API principal to launch it as
//! - [`LauncherConfig`]: runtime tuning (metrics port, backoff knobs, logging)

mod launch;
mod launcher;

pub use launch::LaunchConfig;
pub use launcher::{LogFormat, LauncherConfig};

/// Read a boolean flag the way every launcher setting does: `true`, `1`,
/// `yes` and `on` (any case) are true, anything else is false.
pub(crate) fn parse_bool_flag(value: &str) -> bool {
    let v_lower = value.trim().to_lowercase();
    v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
}
