//! # Launch Configuration
//!
//! Instance parameters and API principal, loaded from the environment.
//!
//! Every key is required but none is validated locally: a missing variable
//! becomes an empty string and is sent to the provider as-is, which rejects
//! it on the first attempt.

use std::fmt;
use zeroize::Zeroizing;

/// Everything the launch request and the request signer need
#[derive(Clone)]
pub struct LaunchConfig {
    /// Shape name (e.g. `VM.Standard.A1.Flex`)
    pub instance_shape: String,
    /// Display name of the instance to create
    pub instance_name: String,
    /// Image OCID
    pub instance_image: String,
    /// Subnet OCID for the primary VNIC
    pub instance_subnet: String,
    /// Availability domain name
    pub instance_availability_domain: String,
    /// Compartment OCID
    pub instance_compartment: String,
    /// Public key material placed in `ssh_authorized_keys`
    pub instance_ssh_authorized_keys: String,
    pub vnic_display_name: String,
    pub vnic_hostname: String,
    /// User OCID of the API principal
    pub user: String,
    /// Fingerprint of the API signing key
    pub fingerprint: String,
    /// PEM private key with `\n` escapes already turned into newlines
    pub private_key: Zeroizing<String>,
    /// Tenancy OCID
    pub tenancy: String,
    /// Region identifier (e.g. `eu-frankfurt-1`)
    pub region: String,
}

impl LaunchConfig {
    /// Load from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup. Keys absent from the lookup are
    /// treated as empty strings.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();

        Self {
            instance_shape: get("INSTANCE_SHAPE"),
            instance_name: get("INSTANCE_NAME"),
            instance_image: get("INSTANCE_IMAGE"),
            instance_subnet: get("INSTANCE_SUBNET"),
            instance_availability_domain: get("INSTANCE_AD"),
            instance_compartment: get("INSTANCE_COMPARTMENT"),
            instance_ssh_authorized_keys: get("INSTANCE_SSHAUTHORIZED"),
            vnic_display_name: get("VNIC_DISPLAY_NAME"),
            vnic_hostname: get("VNIC_HOSTNAME"),
            user: get("USER"),
            fingerprint: get("FINGERPRINT"),
            private_key: Zeroizing::new(unescape_newlines(&get("PRIVATE_KEY"))),
            tenancy: get("TENANCY"),
            region: get("REGION"),
        }
    }
}

impl fmt::Debug for LaunchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchConfig")
            .field("instance_shape", &self.instance_shape)
            .field("instance_name", &self.instance_name)
            .field("instance_availability_domain", &self.instance_availability_domain)
            .field("region", &self.region)
            .field("fingerprint", &self.fingerprint)
            .field("private_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Container environments often cannot carry multi-line values, so the key
/// is accepted with literal `\n` sequences in place of line breaks.
fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}
