// ABOUTME: Provision command implementation.
// ABOUTME: Launches one instance, registers it with a load balancer, then deploys to it.

use serde::Serialize;

use spandex::cloud::{self, AwsCli, PollConfig, Provisioner, RegistrationOutcome};
use spandex::config::Config;
use spandex::diagnostics::{Diagnostics, Warning};
use spandex::error::{Error, Result};
use spandex::output::Output;
use spandex::types::{AvailabilityZone, LoadBalancerName};

use super::deploy::deploy_to_host;
use super::session;
use crate::cli::DeployArgs;

pub struct ProvisionArgs {
    pub suffix: Option<String>,
    pub load_balancer: Option<String>,
    pub no_deploy: bool,
    pub deploy: DeployArgs,
}

#[derive(Serialize)]
struct ProvisionSummary<'a> {
    name: &'a str,
    instance_id: &'a str,
    address: Option<&'a str>,
    load_balancer: Option<&'a str>,
    registered: bool,
    deployed: bool,
}

/// Launch exactly one instance and bring it up as a CouchDB node.
///
/// Load balancer problems become warnings. Everything else is fatal.
pub async fn provision(config: &Config, args: &ProvisionArgs, mut output: Output) -> Result<()> {
    // Input is gathered before anything is launched.
    let inputs = if args.no_deploy {
        None
    } else {
        Some(session::gather_inputs(&args.deploy)?)
    };

    output.start_timer();
    let mut diag = Diagnostics::default();
    let cloud = AwsCli::from_config(config);

    output.progress("Creating EC2 instance...");
    let instance = Provisioner::new(&cloud, PollConfig::from_config(config))
        .provision(config, args.suffix.as_deref())
        .await?;
    let name = instance.name.clone().unwrap_or_else(|| instance.id.to_string());
    output.progress(&format!(
        "Launched {} ({}) at {}",
        name,
        instance.id,
        instance.address().unwrap_or("<no public address>")
    ));

    let load_balancer = args.load_balancer.as_deref().or(config.elb_name.as_deref());
    let mut registered = false;
    if let Some(lb) = load_balancer {
        let zone = config
            .availability_zone
            .as_deref()
            .map(AvailabilityZone::new)
            .or_else(|| instance.placement.clone());

        output.progress(&format!("  → Adding {} to load balancer {}...", instance.id, lb));
        let outcome =
            cloud::register(&cloud, &LoadBalancerName::new(lb), &instance.id, zone.as_ref()).await;
        match outcome {
            RegistrationOutcome::Registered => registered = true,
            RegistrationOutcome::PartialFailure(reason) => {
                diag.warn(Warning::load_balancer(format!(
                    "{} was not added to load balancer {}: {}; add it manually",
                    instance.id, lb, reason
                )));
            }
        }
    }

    let deployment = match (inputs, instance.address()) {
        (Some((properties, options)), Some(host)) => {
            output.progress(&format!("Deploying CouchDB to {host}..."));
            let ctx = session::context(config, host, properties, options);
            deploy_to_host(config, ctx, &output, &mut diag)
                .await
                .map(Some)
        }
        (Some(_), None) => Err(Error::NoPublicAddress(instance.id.to_string())),
        (None, _) => Ok(None),
    };

    // Warnings are reported whether or not the deployment succeeded.
    session::report_warnings(&output, &diag);
    let deployed = match deployment? {
        Some(report) => {
            output.report(&report);
            true
        }
        None => false,
    };

    let summary = ProvisionSummary {
        name: &name,
        instance_id: instance.id.as_str(),
        address: instance.address(),
        load_balancer,
        registered,
        deployed,
    };
    output.success_with(&format!("Provisioned {name}"), Some(&summary));
    Ok(())
}
