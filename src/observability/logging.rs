//! # Logging
//!
//! `tracing-subscriber` setup. `RUST_LOG` wins when set; otherwise the
//! launcher logs at `LOG_LEVEL` (default `info`).

use crate::config::{LauncherConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is not set
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    format!("oci_instance_launcher={log_level}")
}

/// Install the global subscriber.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_logging(
    config: &LauncherConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    }
}
