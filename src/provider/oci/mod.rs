//! # OCI Compute Client
//!
//! Minimal client for the OCI Core Services API: a single signed
//! `LaunchInstance` call.
//!
//! Endpoint: `https://iaas.{region}.oraclecloud.com/20160918/instances/`
//!
//! The client performs exactly one HTTP request per call. Retrying and
//! pacing belong to the caller.

mod requests;
mod responses;
mod signer;

pub use requests::{
    AvailabilityConfig, CreateVnicDetails, InstanceOptions, LaunchInstanceDetails, RecoveryAction,
    ShapeConfig, SourceDetails,
};
pub use signer::{RequestSigner, SignedHeaders, SignerError};

use crate::config::LaunchConfig;
use crate::constants::COMPUTE_API_VERSION;
use crate::observability::metrics;
use crate::provider::{InstanceLauncher, LaunchError, LaunchedInstance};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode, Url};
use responses::{InstanceResponse, OciErrorResponse};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Header carrying the provider's request identifier
const OPC_REQUEST_ID: &str = "opc-request-id";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid compute endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Regional Core Services endpoint
#[must_use]
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://iaas.{region}.oraclecloud.com")
}

/// Signed client for `POST /20160918/instances/`
pub struct ComputeClient {
    http_client: Client,
    launch_url: Url,
    signer: RequestSigner,
}

impl std::fmt::Debug for ComputeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeClient")
            .field("launch_url", &self.launch_url.as_str())
            .field("key_id", &self.signer.key_id())
            .finish_non_exhaustive()
    }
}

impl ComputeClient {
    /// Create a client for the configured region, or for `endpoint_override`
    /// when given (scheme and authority only, e.g. `http://127.0.0.1:8080`).
    ///
    /// # Errors
    /// Fails if the signing key cannot be parsed, the endpoint is not a valid
    /// URL, or the HTTP client cannot be built.
    pub fn new(config: &LaunchConfig, endpoint_override: Option<&str>) -> Result<Self, ClientError> {
        let signer = RequestSigner::new(
            &config.tenancy,
            &config.user,
            &config.fingerprint,
            &config.private_key,
        )?;

        let endpoint = endpoint_override.map_or_else(
            || endpoint_for_region(&config.region),
            |endpoint| endpoint.trim_end_matches('/').to_string(),
        );
        let launch_url = Url::parse(&format!("{endpoint}/{COMPUTE_API_VERSION}/instances/"))
            .map_err(|e| ClientError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        if launch_url.host_str().is_none() {
            return Err(ClientError::InvalidEndpoint {
                endpoint,
                reason: "no host".to_string(),
            });
        }

        let http_client = Client::builder().build()?;

        info!(
            endpoint = %launch_url,
            key_id = signer.key_id(),
            "OCI compute client ready"
        );

        Ok(Self {
            http_client,
            launch_url,
            signer,
        })
    }

    #[must_use]
    pub fn launch_url(&self) -> &Url {
        &self.launch_url
    }

    async fn send_launch(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, LaunchError> {
        let body = serde_json::to_vec(details).map_err(|e| LaunchError::Request(e.to_string()))?;
        let signed = self
            .signer
            .sign_request("POST", &self.launch_url, &body, Utc::now())
            .map_err(|e| LaunchError::Request(e.to_string()))?;

        let mut request = self.http_client.post(self.launch_url.clone());
        for (name, value) in signed.explicit_headers() {
            request = request.header(name, value);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| LaunchError::Transport(e.to_string()))?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(OPC_REQUEST_ID)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        // Once the status line is in, a body read failure keeps the status
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) if status.is_success() => {
                warn!(
                    status = status.as_u16(),
                    request_id = %request_id,
                    error = %e,
                    "Failed to read LaunchInstance response body"
                );
                String::new()
            }
            Err(e) => {
                return Err(LaunchError::Service {
                    status: status.as_u16(),
                    code: canonical_reason(status),
                    message: e.to_string(),
                    request_id,
                });
            }
        };

        if status.is_success() {
            let instance = serde_json::from_str::<InstanceResponse>(&text).ok();
            debug!(status = status.as_u16(), request_id = %request_id, "LaunchInstance accepted");
            return Ok(LaunchedInstance {
                status: status.as_u16(),
                id: instance.as_ref().map(|i| i.id.clone()),
                lifecycle_state: instance.and_then(|i| i.lifecycle_state),
            });
        }

        let (code, message) = match serde_json::from_str::<OciErrorResponse>(&text) {
            Ok(error) => (error.code, error.message),
            Err(_) => (canonical_reason(status), text.trim().to_string()),
        };

        Err(LaunchError::Service {
            status: status.as_u16(),
            code,
            message,
            request_id,
        })
    }
}

fn canonical_reason(status: StatusCode) -> String {
    status.canonical_reason().unwrap_or("Unknown").to_string()
}

#[async_trait]
impl InstanceLauncher for ComputeClient {
    async fn launch_instance(
        &self,
        details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, LaunchError> {
        let start = Instant::now();
        let result = self.send_launch(details).await;
        metrics::observe_launch_request_duration(start.elapsed().as_secs_f64());
        result
    }
}
