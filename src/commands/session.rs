// ABOUTME: Shared helpers for reaching a host and collecting operator input.
// ABOUTME: Used by provision, deploy and the maintenance commands.

use spandex::config::Config;
use spandex::diagnostics::{Diagnostics, Warning};
use spandex::error::Result;
use spandex::output::Output;
use spandex::properties::{
    self, DeployOptions, MonitoringConfig, ProvisioningProperties, StdinPrompter,
};
use spandex::ssh::{Session, connect_with_retry};
use spandex::workflow::{DeploymentContext, Paths, SettleConfig};

use crate::cli::DeployArgs;

/// Open an SSH session, retrying while the host boots.
pub async fn connect(config: &Config, host: &str, output: &Output) -> Result<Session> {
    output.progress(&format!("  → Connecting to {host}..."));
    let session = connect_with_retry(
        config.session_config(host),
        config.ssh_connect_attempts,
        config.ssh_connect_delay,
    )
    .await?;
    Ok(session)
}

/// Close the session. Failure is only a warning.
pub async fn disconnect(session: Session, diag: &mut Diagnostics) {
    let host = session.host().to_string();
    if let Err(e) = session.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {host}: {e}"
        )));
    }
}

/// Input phase: everything the workflow needs from the operator.
///
/// With a properties file nothing is prompted; monitoring is then only set up
/// when a key is passed on the command line.
pub fn gather_inputs(args: &DeployArgs) -> Result<(ProvisioningProperties, DeployOptions)> {
    let mut prompter = StdinPrompter;

    let input = match &args.properties {
        Some(path) => properties::from_file(path)?,
        None => properties::gather(&mut prompter)?,
    };
    let validated = input.validate()?;

    let monitoring = match (&args.monitoring_key, &args.properties) {
        (Some(key), _) => Some(MonitoringConfig {
            license_key: key.clone(),
        }),
        (None, Some(_)) => None,
        (None, None) => properties::gather_monitoring(&mut prompter)?,
    };

    let options = DeployOptions {
        setup_database: !args.skip_setup,
        flush_database: !args.skip_flush,
        monitoring,
    };
    Ok((validated, options))
}

/// Paths for this configuration's module repository.
pub fn paths(config: &Config) -> Paths {
    Paths::default().with_repo(config.module_repo.as_str())
}

pub fn context(
    config: &Config,
    host: &str,
    properties: ProvisioningProperties,
    options: DeployOptions,
) -> DeploymentContext {
    DeploymentContext::new(config.user.as_str(), host, properties, options)
        .with_paths(paths(config))
        .with_settle(SettleConfig::from_config(config))
}

/// Print collected warnings.
pub fn report_warnings(output: &Output, diag: &Diagnostics) {
    for warning in diag.warnings() {
        output.warning(warning);
    }
}
