// ABOUTME: Generic deployment struct parameterized by state marker.
// ABOUTME: Carries the remote handle, the immutable context and the running report.

use crate::remote::Remote;

use super::context::DeploymentContext;
use super::report::DeployReport;
use super::state::Fresh;

/// A deployment in progress, parameterized by its current state.
///
/// Transitions consume the deployment and return it in the next state, so a
/// step cannot run before the ones it depends on.
#[derive(Debug)]
pub struct Deployment<'r, S> {
    pub(crate) remote: Remote<'r>,
    pub(crate) ctx: DeploymentContext,
    pub(crate) report: DeployReport,
    pub(crate) state: S,
}

impl<'r> Deployment<'r, Fresh> {
    pub fn new(remote: Remote<'r>, ctx: DeploymentContext) -> Self {
        Deployment {
            report: DeployReport::new(ctx.host.clone()),
            remote,
            ctx,
            state: Fresh,
        }
    }
}

impl<S> Deployment<'_, S> {
    pub fn context(&self) -> &DeploymentContext {
        &self.ctx
    }

    /// Steps recorded so far.
    pub fn report(&self) -> &DeployReport {
        &self.report
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}
