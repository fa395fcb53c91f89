//! OCI Instance Launcher Library
//!
//! Core functionality for the capacity-seeking OCI instance launcher.
//! Tests are included in the module files and under `tests/`.

pub mod backoff;
pub mod config;
pub mod constants;
pub mod observability;
pub mod provider;
pub mod runtime;
pub mod server;
