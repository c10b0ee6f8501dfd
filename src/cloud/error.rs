// ABOUTME: Cloud API error types with SNAFU pattern.
// ABOUTME: Separates API failures, missing resources, launch failures and polling timeouts.

use snafu::Snafu;

use super::types::InstanceState;

/// Errors from the compute and load balancer APIs.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CloudError {
    #[snafu(display("{operation} failed: {message}"))]
    Api { operation: String, message: String },

    #[snafu(display("load balancer not found: {name}"))]
    NotFound { name: String },

    #[snafu(display(
        "instance {instance_id} not running after {attempts} polls (last state: {last_state})"
    ))]
    ProvisioningTimeout {
        instance_id: String,
        attempts: u32,
        last_state: InstanceState,
    },

    #[snafu(display("instance {instance_id} entered {state} while launching"))]
    Launch {
        instance_id: String,
        state: InstanceState,
    },

    #[snafu(display("failed to run the aws CLI: {source}"))]
    Spawn { source: std::io::Error },

    #[snafu(display("unexpected response from {operation}: {source}"))]
    Decode {
        operation: String,
        source: serde_json::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudErrorKind {
    /// The provider rejected or failed the call.
    Api,
    /// The named resource does not exist.
    NotFound,
    /// The instance never reached `running` within the polling budget.
    ProvisioningTimeout,
    /// The instance died before it reached `running`.
    Launch,
}

impl CloudError {
    pub fn kind(&self) -> CloudErrorKind {
        match self {
            CloudError::Api { .. } | CloudError::Spawn { .. } | CloudError::Decode { .. } => {
                CloudErrorKind::Api
            }
            CloudError::NotFound { .. } => CloudErrorKind::NotFound,
            CloudError::ProvisioningTimeout { .. } => CloudErrorKind::ProvisioningTimeout,
            CloudError::Launch { .. } => CloudErrorKind::Launch,
        }
    }
}
