// ABOUTME: Deployment workflow over a single host using the type state pattern.
// ABOUTME: Fresh -> PuppetInstalled -> ... -> Done, plus standalone maintenance tasks.

mod boot;
mod context;
mod deployment;
mod error;
mod maintenance;
mod readiness;
mod report;
mod state;
mod transitions;

pub use boot::{BootCommands, amend_boot_script};
pub use context::{DeploymentContext, Paths, ReadinessProbe, SettleConfig};
pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind, Step};
pub use maintenance::{
    PLUGIN_BINARY, SYSMOND_BINARY, configure_monitoring, flush_database, plugin_start_command,
    replicate_database,
};
pub use readiness::{Readiness, wait_until_ready};
pub use report::{DeployReport, StepRecord, StepStatus};
pub use state::{
    BootConfigured, DatabaseReady, Done, Fresh, ModuleApplied, ModuleUpdated,
    MonitoringConfigured, PuppetInstalled, Replicated,
};

use crate::remote::Remote;

/// Run every step in order. The first failure aborts the rest.
pub async fn run_deployment(
    remote: &Remote<'_>,
    ctx: DeploymentContext,
) -> Result<DeployReport, DeployError> {
    tracing::info!("deploying to {}", ctx.host);

    Deployment::new(remote.clone(), ctx)
        .prepare_host()
        .await?
        .install_agent()
        .await?
        .update_module()
        .await?
        .apply_module()
        .await?
        .setup_database()
        .await?
        .replicate()
        .await?
        .configure_monitoring()
        .await?
        .configure_boot()
        .await?
        .finish()
        .await
}
