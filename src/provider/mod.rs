//! # Provider
//!
//! The boundary to the cloud provider: one opaque "launch an instance" call.
//!
//! The retry machinery only needs to know whether a call produced an HTTP
//! response and, if so, its status and error text. [`LaunchError`] carries
//! exactly that.

use crate::backoff::AttemptOutcome;
use async_trait::async_trait;
use thiserror::Error;

pub mod oci;

pub use oci::LaunchInstanceDetails;

/// Something that can submit a launch request
#[async_trait]
pub trait InstanceLauncher: Send + Sync {
    /// Submit one launch request. No retries happen at this level.
    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, LaunchError>;
}

/// Accepted launch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchedInstance {
    /// HTTP status of the accepted request
    pub status: u16,
    /// Instance OCID, when the response body could be read
    pub id: Option<String>,
    pub lifecycle_state: Option<String>,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    /// The provider answered with a non-success status.
    ///
    /// Rendered the way the provider's SDKs render service errors so the
    /// `Message: ` marker is present for reason extraction.
    #[error(
        "Error returned by Compute Service. Http Status Code: {status}. Error Code: {code}. \
         Opc request id: {request_id}. Message: {message}\nOperation Name: LaunchInstance"
    )]
    Service {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },
    /// The request never produced an HTTP response
    #[error("{0}")]
    Transport(String),
    /// The request could not be built or signed
    #[error("failed to build launch request: {0}")]
    Request(String),
}

impl LaunchError {
    /// HTTP status, if the provider answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            Self::Transport(_) | Self::Request(_) => None,
        }
    }
}

impl From<&LaunchError> for AttemptOutcome {
    fn from(error: &LaunchError) -> Self {
        match error.status() {
            Some(status) => AttemptOutcome::http(status, error.to_string()),
            None => AttemptOutcome::transport(error.to_string()),
        }
    }
}

impl From<&Result<LaunchedInstance, LaunchError>> for AttemptOutcome {
    fn from(result: &Result<LaunchedInstance, LaunchError>) -> Self {
        match result {
            Ok(instance) => AttemptOutcome::success(instance.status),
            Err(error) => error.into(),
        }
    }
}
