// ABOUTME: Best-effort load balancer registration for a provisioned instance.
// ABOUTME: Failures are reported as a partial outcome and never undo provisioning.

use snafu::OptionExt as _;
use tracing::{info, warn};

use super::error::{CloudError, NotFoundSnafu};
use super::traits::LoadBalancerApi;
use crate::types::{AvailabilityZone, InstanceId, LoadBalancerName};

/// Result of attaching an instance to a load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    /// The instance runs but is not (fully) behind the load balancer.
    PartialFailure(String),
}

impl RegistrationOutcome {
    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationOutcome::Registered)
    }
}

/// Attach `instance` to the load balancer `name`.
///
/// With a `zone`, cross-zone balancing is switched on if it is off and the
/// zone is enabled if the load balancer does not cover it yet. Registering an
/// instance that is already a member is skipped.
pub async fn register<L: LoadBalancerApi + ?Sized>(
    api: &L,
    name: &LoadBalancerName,
    instance: &InstanceId,
    zone: Option<&AvailabilityZone>,
) -> RegistrationOutcome {
    match try_register(api, name, instance, zone).await {
        Ok(()) => {
            info!("{} registered with load balancer {}", instance, name);
            RegistrationOutcome::Registered
        }
        Err(e) => {
            warn!(
                "could not add {} to load balancer {}: {}; add it manually",
                instance, name, e
            );
            RegistrationOutcome::PartialFailure(e.to_string())
        }
    }
}

async fn try_register<L: LoadBalancerApi + ?Sized>(
    api: &L,
    name: &LoadBalancerName,
    instance: &InstanceId,
    zone: Option<&AvailabilityZone>,
) -> Result<(), CloudError> {
    let balancer = api
        .describe_load_balancer(name)
        .await?
        .context(NotFoundSnafu {
            name: name.as_str(),
        })?;

    if let Some(zone) = zone {
        if !balancer.cross_zone {
            info!("enabling cross-zone balancing on {}", name);
            api.enable_cross_zone(name).await?;
        }
        if !balancer.zones.contains(zone) {
            info!("enabling zone {} on {}", zone, name);
            api.enable_zone(name, zone).await?;
        }
    }

    if balancer.instances.contains(instance) {
        info!("{} is already behind {}", instance, name);
        return Ok(());
    }
    api.register_instance(name, instance).await
}
