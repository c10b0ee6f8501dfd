// ABOUTME: Per-step record of what a deployment changed.
// ABOUTME: Serializable so the CLI can print it as JSON.

use serde::Serialize;

use super::error::Step;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step modified the host.
    Changed,
    /// The host was already converged.
    Unchanged,
    /// The step does not apply to this deployment.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of a full deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    pub host: String,
    pub steps: Vec<StepRecord>,
}

impl DeployReport {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            steps: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, step: Step, status: StepStatus, detail: Option<String>) {
        match &detail {
            Some(detail) => tracing::info!("{}: {:?} ({})", step, status, detail),
            None => tracing::info!("{}: {:?}", step, status),
        }
        self.steps.push(StepRecord {
            step,
            status,
            detail,
        });
    }

    pub fn status(&self, step: Step) -> Option<StepStatus> {
        self.steps.iter().find(|r| r.step == step).map(|r| r.status)
    }

    /// Whether `step` ran and changed something.
    pub fn changed(&self, step: Step) -> bool {
        self.status(step) == Some(StepStatus::Changed)
    }
}
