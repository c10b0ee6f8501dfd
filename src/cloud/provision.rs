// ABOUTME: Launches a database instance, waits for it to run, and names it.
// ABOUTME: Polling is bounded; names follow <ENV>-CouchDB-<suffix>.

use std::time::Duration;

use tracing::{debug, info};

use super::error::{CloudError, LaunchSnafu, ProvisioningTimeoutSnafu};
use super::traits::ComputeApi;
use super::types::{Instance, InstanceState, RunInstanceRequest, Tag};
use crate::config::Config;

/// Fixed middle segment of every instance name.
pub const NAME_INFIX: &str = "CouchDB";

/// `<ENV>-CouchDB-<suffix>`.
pub fn instance_name(environment: &str, suffix: &str) -> String {
    format!("{environment}-{NAME_INFIX}-{suffix}")
}

/// Eight lowercase hex characters.
pub fn random_suffix() -> String {
    hex::encode(rand::random::<[u8; 4]>())
}

/// How often and how long to wait for an instance to reach `running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.max_poll_attempts,
        }
    }
}

/// Launches and tags instances through a [`ComputeApi`].
pub struct Provisioner<'a, C: ComputeApi + ?Sized> {
    api: &'a C,
    poll: PollConfig,
}

impl<'a, C: ComputeApi + ?Sized> Provisioner<'a, C> {
    pub fn new(api: &'a C, poll: PollConfig) -> Self {
        Self { api, poll }
    }

    /// Launch one instance from `config`, wait until it runs, then tag it.
    ///
    /// A blank or absent `suffix` is replaced with a random one. The `Project`
    /// tag is only applied when the project name is non-empty.
    pub async fn provision(
        &self,
        config: &Config,
        suffix: Option<&str>,
    ) -> Result<Instance, CloudError> {
        let suffix = match suffix.map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => random_suffix(),
        };
        let name = instance_name(&config.environment, &suffix);

        let request = RunInstanceRequest::from_config(config);
        info!(
            "launching {} ({}, {}) in {}",
            name, request.ami, request.instance_type, config.region
        );
        let launched = self.api.run_instance(&request).await?;

        let mut instance = self.wait_until_running(launched).await?;

        self.api
            .create_tags(&instance.id, &[Tag::new("Name", name.as_str())])
            .await?;
        if !config.project_name.trim().is_empty() {
            self.api
                .create_tags(
                    &instance.id,
                    &[Tag::new("Project", config.project_name.as_str())],
                )
                .await?;
        }
        instance.name = Some(name);

        info!(
            "instance {} running at {}",
            instance.id,
            instance.address().unwrap_or("<no public address>")
        );
        Ok(instance)
    }

    /// Re-describe the instance until it is `running`.
    ///
    /// Fails with a timeout after `max_attempts` polls, or immediately if the
    /// instance starts shutting down.
    pub async fn wait_until_running(&self, mut instance: Instance) -> Result<Instance, CloudError> {
        let mut polls = 0;

        loop {
            if instance.state.is_gone() {
                return LaunchSnafu {
                    instance_id: instance.id.as_str(),
                    state: instance.state,
                }
                .fail();
            }
            if instance.state == InstanceState::Running {
                return Ok(instance);
            }
            if polls >= self.poll.max_attempts {
                return ProvisioningTimeoutSnafu {
                    instance_id: instance.id.as_str(),
                    attempts: polls,
                    last_state: instance.state,
                }
                .fail();
            }

            debug!("instance {} is {}", instance.id, instance.state);
            tokio::time::sleep(self.poll.interval).await;
            instance = self.api.describe_instance(&instance.id).await?;
            polls += 1;
        }
    }
}
