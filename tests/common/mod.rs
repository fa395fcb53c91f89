//! Common test utilities for launcher integration tests
//!
//! Provides a scripted [`InstanceLauncher`], a capturing [`RequestRecorder`]
//! and configuration built around the RSA fixture key.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use oci_instance_launcher::backoff::{RequestLabels, RequestRecorder};
use oci_instance_launcher::config::LaunchConfig;
use oci_instance_launcher::provider::{
    InstanceLauncher, LaunchError, LaunchInstanceDetails, LaunchedInstance,
};
use oci_instance_launcher::runtime::RunContext;
use std::sync::Mutex;
use tokio::time::Instant;

pub const PKCS8_KEY: &str = include_str!("../fixtures/oci_api_key_pkcs8.pem");

pub const TENANCY: &str = "ocid1.tenancy.oc1..aaaatenancy";
pub const USER: &str = "ocid1.user.oc1..aaaauser";
pub const FINGERPRINT: &str = "20:3b:97:13:55:1c:5b:0d:d3:37:d8:50:4e:c5:3a:34";

/// Configuration with every key set, the way a `.env` file would
pub fn launch_config() -> LaunchConfig {
    LaunchConfig::from_lookup(|key| {
        let value = match key {
            "INSTANCE_SHAPE" => "VM.Standard.A1.Flex",
            "INSTANCE_NAME" => "capacity-hunter",
            "INSTANCE_IMAGE" => "ocid1.image.oc1..aaaaimage",
            "INSTANCE_SUBNET" => "ocid1.subnet.oc1..aaaasubnet",
            "INSTANCE_AD" => "kIdk:EU-FRANKFURT-1-AD-1",
            "INSTANCE_COMPARTMENT" => "ocid1.compartment.oc1..aaaacompartment",
            "INSTANCE_SSHAUTHORIZED" => "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 hunter@example",
            "VNIC_DISPLAY_NAME" => "hunter-vnic",
            "VNIC_HOSTNAME" => "hunter",
            "USER" => USER,
            "FINGERPRINT" => FINGERPRINT,
            "PRIVATE_KEY" => PKCS8_KEY,
            "TENANCY" => TENANCY,
            "REGION" => "eu-frankfurt-1",
            _ => return None,
        };
        Some(value.to_string())
    })
}

/// One scripted provider answer
#[derive(Debug, Clone)]
pub enum Step {
    /// 429 TooManyRequests
    RateLimited,
    /// Any other status with its service message
    Status(u16, &'static str),
    /// No HTTP response
    Transport(&'static str),
    /// 200 with an instance OCID
    Accepted(&'static str),
}

impl Step {
    fn result(&self) -> Result<LaunchedInstance, LaunchError> {
        match self {
            Self::RateLimited => Err(LaunchError::Service {
                status: 429,
                code: "TooManyRequests".to_string(),
                message: "Too many requests for the user".to_string(),
                request_id: "opc-429".to_string(),
            }),
            Self::Status(status, message) => Err(LaunchError::Service {
                status: *status,
                code: "InternalError".to_string(),
                message: (*message).to_string(),
                request_id: "opc-other".to_string(),
            }),
            Self::Transport(error) => Err(LaunchError::Transport((*error).to_string())),
            Self::Accepted(id) => Ok(LaunchedInstance {
                status: 200,
                id: Some((*id).to_string()),
                lifecycle_state: Some("PROVISIONING".to_string()),
            }),
        }
    }
}

/// Plays `script` in a cycle and stops `ctx` once `stop_after` attempts
/// were made. Records the (virtual) instant of every attempt.
pub struct ScriptedLauncher {
    script: Vec<Step>,
    stop_after: usize,
    ctx: RunContext,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedLauncher {
    pub fn new(script: Vec<Step>, stop_after: usize, ctx: RunContext) -> Self {
        assert!(!script.is_empty(), "script needs at least one step");
        Self {
            script,
            stop_after,
            ctx,
            attempts: Mutex::new(Vec::new()),
        }
    }

    pub fn attempt_instants(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }

    /// Whole seconds between consecutive attempts
    pub fn gaps_secs(&self) -> Vec<u64> {
        self.attempt_instants()
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_secs())
            .collect()
    }
}

#[async_trait]
impl InstanceLauncher for ScriptedLauncher {
    async fn launch_instance(
        &self,
        _details: &LaunchInstanceDetails,
    ) -> Result<LaunchedInstance, LaunchError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.push(Instant::now());
            attempts.len()
        };
        if attempt >= self.stop_after {
            self.ctx.stop();
        }
        self.script[(attempt - 1) % self.script.len()].result()
    }
}

#[derive(Debug, Default)]
pub struct CapturingRecorder {
    labels: Mutex<Vec<RequestLabels>>,
}

impl CapturingRecorder {
    pub fn labels(&self) -> Vec<RequestLabels> {
        self.labels.lock().unwrap().clone()
    }
}

impl RequestRecorder for CapturingRecorder {
    fn record_request(&self, labels: &RequestLabels) {
        self.labels.lock().unwrap().push(labels.clone());
    }
}
