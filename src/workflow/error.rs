// ABOUTME: Error types for deployment workflow steps.
// ABOUTME: Every error names the step that failed; the remaining steps never run.

use serde::Serialize;
use std::fmt;

use crate::module::ApplyError;
use crate::remote::RemoteCommandError;

/// A workflow step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    PrepareHost,
    InstallAgent,
    UpdateModule,
    ApplyModule,
    SetupDatabase,
    Replicate,
    ConfigureMonitoring,
    ConfigureBoot,
    Finish,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::PrepareHost => "prepare-host",
            Step::InstallAgent => "install-agent",
            Step::UpdateModule => "update-module",
            Step::ApplyModule => "apply-module",
            Step::SetupDatabase => "setup-database",
            Step::Replicate => "replicate",
            Step::ConfigureMonitoring => "configure-monitoring",
            Step::ConfigureBoot => "configure-boot",
            Step::Finish => "finish",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Errors that abort a deployment.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// A remote command in `step` failed.
    #[error("{step} failed: {source}")]
    Remote {
        step: Step,
        #[source]
        source: RemoteCommandError,
    },

    /// The module could not be applied.
    #[error("{step} failed: {source}")]
    Apply {
        step: Step,
        #[source]
        source: ApplyError,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    RemoteCommand,
    Apply,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Remote { .. } => DeployErrorKind::RemoteCommand,
            DeployError::Apply { .. } => DeployErrorKind::Apply,
        }
    }

    /// The step that failed.
    pub fn step(&self) -> Step {
        match self {
            DeployError::Remote { step, .. } | DeployError::Apply { step, .. } => *step,
        }
    }
}

/// Attach the failing step to a remote command error.
pub(crate) trait RemoteErrorExt<T> {
    fn during(self, step: Step) -> Result<T, DeployError>;
}

impl<T> RemoteErrorExt<T> for Result<T, RemoteCommandError> {
    fn during(self, step: Step) -> Result<T, DeployError> {
        self.map_err(|source| DeployError::Remote { step, source })
    }
}
