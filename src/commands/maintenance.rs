// ABOUTME: Standalone maintenance commands against an existing host.
// ABOUTME: Database setup/flush, replication to master, and monitoring setup.

use spandex::config::Config;
use spandex::diagnostics::Diagnostics;
use spandex::error::Result;
use spandex::output::Output;
use spandex::properties::MonitoringConfig;
use spandex::remote::Remote;
use spandex::workflow;

use super::session;

pub async fn flush_database(
    config: &Config,
    host: &str,
    setup_database: bool,
    flush_database: bool,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let session = session::connect(config, host, &output).await?;

    let result = workflow::flush_database(
        &Remote::new(&session),
        &session::paths(config),
        setup_database,
        flush_database,
    )
    .await;

    session::disconnect(session, &mut diag).await;
    session::report_warnings(&output, &diag);
    result?;

    output.success(&format!("Database setup finished on {host}"));
    Ok(())
}

pub async fn replicate_database(
    config: &Config,
    host: &str,
    masterless: bool,
    slave: bool,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let session = session::connect(config, host, &output).await?;

    let result = workflow::replicate_database(
        &Remote::new(&session),
        &session::paths(config),
        masterless,
        slave,
    )
    .await;

    session::disconnect(session, &mut diag).await;
    session::report_warnings(&output, &diag);
    let ran = result?;
    if ran {
        output.success(&format!("Replication started on {host}"));
    } else {
        output.success("Nothing to replicate for a standalone node");
    }
    Ok(())
}

pub async fn configure_monitoring(
    config: &Config,
    host: &str,
    license_key: String,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let session = session::connect(config, host, &output).await?;

    let monitoring = MonitoringConfig { license_key };
    let result = workflow::configure_monitoring(&Remote::new(&session), &monitoring).await;

    session::disconnect(session, &mut diag).await;
    session::report_warnings(&output, &diag);
    result?;

    output.success(&format!("Monitoring configured on {host}"));
    Ok(())
}
