//! OCI Compute response bodies
//!
//! Only the fields the launcher logs or reports are modelled.

use serde::Deserialize;

/// Subset of the `Instance` resource returned by a successful launch
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InstanceResponse {
    pub id: String,
    #[serde(default)]
    pub lifecycle_state: Option<String>,
}

/// Error body returned with every non-2xx status
///
/// API Reference: https://docs.oracle.com/en-us/iaas/Content/API/References/apierrors.htm
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OciErrorResponse {
    /// Error code (e.g. "TooManyRequests", "InternalError")
    pub code: String,
    /// Human-readable error message
    pub message: String,
}
