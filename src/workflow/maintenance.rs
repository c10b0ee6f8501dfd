// ABOUTME: Database and monitoring tasks that also run on their own against a host.
// ABOUTME: The deployment workflow reuses them for its setup, replication and monitoring steps.

use nonempty::NonEmpty;

use super::context::Paths;
use crate::properties::MonitoringConfig;
use crate::remote::{
    ProcessMatch, Remote, RemoteCommandError, ensure_installed, ensure_process_restarted,
    shell_quote,
};

pub const SYSMOND_BINARY: &str = "/usr/sbin/nrsysmond";
pub const PLUGIN_BINARY: &str = "/usr/local/bin/newrelic_plugin_agent";
pub const PLUGIN_CONFIG: &str = "/etc/newrelic/newrelic_plugin_agent.cfg";
const PIP_BINARY: &str = "/usr/bin/pip";
const MONITORING_USER: &str = "newrelic";

/// Command that starts the application-metrics plugin.
pub fn plugin_start_command() -> String {
    format!("{PLUGIN_BINARY} -c {PLUGIN_CONFIG}")
}

fn sysmond_install_steps() -> NonEmpty<String> {
    NonEmpty {
        head: "echo deb http://apt.newrelic.com/debian/ newrelic non-free \
               >> /etc/apt/sources.list.d/newrelic.list"
            .to_string(),
        tail: vec![
            "wget -O- https://download.newrelic.com/548C16BF.gpg | apt-key add -".to_string(),
            "apt-get -y update".to_string(),
            "apt-get -y install newrelic-sysmond".to_string(),
        ],
    }
}

/// Run the database setup script with the requested flags.
pub async fn flush_database(
    remote: &Remote<'_>,
    paths: &Paths,
    setup_database: bool,
    flush_database: bool,
) -> Result<(), RemoteCommandError> {
    remote
        .run(&paths.setup_command(setup_database, flush_database))
        .await?;
    Ok(())
}

/// Run the replication script for a masterless or slave node. Returns whether it ran.
pub async fn replicate_database(
    remote: &Remote<'_>,
    paths: &Paths,
    masterless: bool,
    slave: bool,
) -> Result<bool, RemoteCommandError> {
    if !(masterless || slave) {
        tracing::debug!("standalone node, no replication");
        return Ok(false);
    }
    remote.run(&paths.replication_command()).await?;
    Ok(true)
}

/// Install, license and (re)start the system-metrics daemon and the
/// application-metrics plugin.
pub async fn configure_monitoring(
    remote: &Remote<'_>,
    monitoring: &MonitoringConfig,
) -> Result<(), RemoteCommandError> {
    ensure_installed(remote, SYSMOND_BINARY, &sysmond_install_steps()).await?;
    remote
        .run_privileged(&format!(
            "/usr/sbin/nrsysmond-config --set license_key={}",
            shell_quote(&monitoring.license_key)
        ))
        .await?;
    ensure_process_restarted(
        remote,
        &ProcessMatch::new("nrsysmond").owned_by(MONITORING_USER),
        "/etc/init.d/newrelic-sysmond start",
    )
    .await?;

    ensure_installed(
        remote,
        PIP_BINARY,
        &NonEmpty::new("apt-get -y install gcc python-dev python-pip".to_string()),
    )
    .await?;
    ensure_installed(
        remote,
        PLUGIN_BINARY,
        &NonEmpty::new("pip install newrelic-plugin-agent".to_string()),
    )
    .await?;
    ensure_process_restarted(
        remote,
        &ProcessMatch::new("newrelic_plugin_agent").owned_by(MONITORING_USER),
        &plugin_start_command(),
    )
    .await?;

    Ok(())
}
