//! OCI Compute LaunchInstance request body
//!
//! API Reference: https://docs.oracle.com/en-us/iaas/api/#/en/iaas/20160918/LaunchInstanceDetails

use crate::config::LaunchConfig;
use crate::constants::{INSTANCE_MEMORY_GBS, INSTANCE_OCPUS};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata key the image's cloud-init reads authorized SSH keys from
const SSH_AUTHORIZED_KEYS: &str = "ssh_authorized_keys";

/// Body of `POST /20160918/instances/`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchInstanceDetails {
    pub compartment_id: String,
    pub display_name: String,
    pub availability_domain: String,
    pub instance_options: InstanceOptions,
    pub availability_config: AvailabilityConfig,
    pub create_vnic_details: CreateVnicDetails,
    pub source_details: SourceDetails,
    pub shape: String,
    pub shape_config: ShapeConfig,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOptions {
    pub are_legacy_imds_endpoints_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityConfig {
    pub is_live_migration_preferred: bool,
    pub recovery_action: RecoveryAction,
}

/// What the provider does with the instance after a host failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryAction {
    RestoreInstance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVnicDetails {
    pub assign_public_ip: bool,
    pub display_name: String,
    pub hostname_label: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sourceType")]
pub enum SourceDetails {
    #[serde(rename = "image")]
    Image {
        #[serde(rename = "imageId")]
        image_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeConfig {
    pub ocpus: f32,
    #[serde(rename = "memoryInGBs")]
    pub memory_in_gbs: f32,
}

impl LaunchInstanceDetails {
    /// Build the request from configuration.
    ///
    /// Shape size and availability behaviour are fixed: 4 OCPUs, 24 GiB,
    /// live migration preferred, restore on failure, public IP assigned.
    #[must_use]
    pub fn from_config(config: &LaunchConfig) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            SSH_AUTHORIZED_KEYS.to_string(),
            config.instance_ssh_authorized_keys.clone(),
        );

        Self {
            compartment_id: config.instance_compartment.clone(),
            display_name: config.instance_name.clone(),
            availability_domain: config.instance_availability_domain.clone(),
            instance_options: InstanceOptions {
                are_legacy_imds_endpoints_disabled: false,
            },
            availability_config: AvailabilityConfig {
                is_live_migration_preferred: true,
                recovery_action: RecoveryAction::RestoreInstance,
            },
            create_vnic_details: CreateVnicDetails {
                assign_public_ip: true,
                display_name: config.vnic_display_name.clone(),
                hostname_label: config.vnic_hostname.clone(),
                subnet_id: config.instance_subnet.clone(),
            },
            source_details: SourceDetails::Image {
                image_id: config.instance_image.clone(),
            },
            shape: config.instance_shape.clone(),
            shape_config: ShapeConfig {
                ocpus: INSTANCE_OCPUS,
                memory_in_gbs: INSTANCE_MEMORY_GBS,
            },
            metadata,
        }
    }
}
