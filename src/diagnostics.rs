// ABOUTME: Diagnostics accumulator for non-fatal problems during a run.
// ABOUTME: Load balancer registration and SSH disconnect failures never change the exit status.

use serde::Serialize;

/// Collects non-fatal warnings during provisioning and deployment.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// The instance runs but could not be put behind the load balancer.
    pub fn load_balancer(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::LoadBalancerRegistration,
            message: message.into(),
        }
    }

    pub fn ssh_disconnect(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::SshDisconnect,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Partial failure attaching an instance to a load balancer.
    LoadBalancerRegistration,
    /// Failed to cleanly disconnect SSH session.
    SshDisconnect,
}
