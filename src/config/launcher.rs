//! # Launcher Configuration
//!
//! Runtime settings loaded from environment variables.

use super::parse_bool_flag;
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Launcher-level configuration
///
/// All settings have defaults (see [`crate::constants`]) and can be
/// overridden via environment variables.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Delay the backoff state starts at, and the floor it never decays below
    pub initial_delay_secs: u64,
    /// Whether non-rate-limited outcomes may lower the delay.
    /// Off by default: the delay only ever grows.
    pub delay_decay_enabled: bool,
    /// Minimum time between two downward adjustments (seconds)
    pub delay_decay_interval_secs: u64,
    /// Attempts performed per provisioning call
    pub attempts_per_call: u32,
    /// Overrides the regional Compute endpoint (e.g. for a mock server)
    pub compute_endpoint: Option<String>,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
            delay_decay_enabled: false,
            delay_decay_interval_secs: DEFAULT_DELAY_DECAY_INTERVAL_SECS,
            attempts_per_call: DEFAULT_ATTEMPTS_PER_CALL,
            compute_endpoint: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

impl LauncherConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup with defaults.
    /// Unparseable values fall back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            metrics_port: var_or_default(&lookup, "METRICS_PORT", defaults.metrics_port),
            initial_delay_secs: var_or_default(
                &lookup,
                "INITIAL_DELAY_SECS",
                defaults.initial_delay_secs,
            ),
            delay_decay_enabled: lookup("DELAY_DECAY_ENABLED")
                .map_or(defaults.delay_decay_enabled, |v| parse_bool_flag(&v)),
            delay_decay_interval_secs: var_or_default(
                &lookup,
                "DELAY_DECAY_INTERVAL_SECS",
                defaults.delay_decay_interval_secs,
            ),
            attempts_per_call: var_or_default(
                &lookup,
                "ATTEMPTS_PER_CALL",
                defaults.attempts_per_call,
            )
            .max(1),
            compute_endpoint: lookup("OCI_COMPUTE_ENDPOINT").filter(|v| !v.trim().is_empty()),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: var_or_default(&lookup, "LOG_FORMAT", defaults.log_format),
        }
    }

    /// Get the delay decay interval duration
    #[must_use]
    pub fn delay_decay_interval(&self) -> Duration {
        Duration::from_secs(self.delay_decay_interval_secs)
    }
}

/// Read a variable through `lookup` or return the default value
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
