// ABOUTME: Deploy command implementation.
// ABOUTME: Runs the deployment workflow against an existing host over SSH.

use spandex::config::Config;
use spandex::diagnostics::Diagnostics;
use spandex::error::Result;
use spandex::output::Output;
use spandex::remote::Remote;
use spandex::workflow::{DeployReport, DeploymentContext, run_deployment};

use super::session;
use crate::cli::DeployArgs;

/// Deploy CouchDB to `host`.
pub async fn deploy(
    config: &Config,
    host: &str,
    args: &DeployArgs,
    mut output: Output,
) -> Result<()> {
    let (properties, options) = session::gather_inputs(args)?;

    output.start_timer();
    let mut diag = Diagnostics::default();
    let ctx = session::context(config, host, properties, options);

    let deployment = deploy_to_host(config, ctx, &output, &mut diag).await;

    session::report_warnings(&output, &diag);
    let report = deployment?;
    output.report(&report);
    output.success(&format!("Deployed CouchDB to {host}"));
    Ok(())
}

/// Connect to the context's host, run every workflow step, then disconnect.
pub async fn deploy_to_host(
    config: &Config,
    ctx: DeploymentContext,
    output: &Output,
    diag: &mut Diagnostics,
) -> Result<DeployReport> {
    let session = session::connect(config, &ctx.host, output).await?;

    output.progress("  → Running deployment...");
    let result = run_deployment(&Remote::new(&session), ctx).await;

    session::disconnect(session, diag).await;
    Ok(result?)
}
