// ABOUTME: Cloud resource handles: instances, their lifecycle state, and load balancers.
// ABOUTME: Handles are snapshots; the provider is always the system of record.

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use std::collections::BTreeSet;
use std::fmt;

use crate::config::Config;
use crate::types::{AvailabilityZone, InstanceId, LoadBalancerName};

/// Instance lifecycle: pending -> running -> [stopping -> stopped] -> terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Running,
    ShuttingDown,
    Stopping,
    Stopped,
    Terminated,
}

impl InstanceState {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "pending" => Some(InstanceState::Pending),
            "running" => Some(InstanceState::Running),
            "shutting-down" => Some(InstanceState::ShuttingDown),
            "stopping" => Some(InstanceState::Stopping),
            "stopped" => Some(InstanceState::Stopped),
            "terminated" => Some(InstanceState::Terminated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::Terminated => "terminated",
        }
    }

    /// The instance is on its way out and will never reach `running`.
    pub fn is_gone(&self) -> bool {
        matches!(self, InstanceState::ShuttingDown | InstanceState::Terminated)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a compute instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: InstanceId,
    pub state: InstanceState,
    pub placement: Option<AvailabilityZone>,
    pub public_dns: Option<String>,
    pub public_ip: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
    /// Name tag, once applied.
    pub name: Option<String>,
}

impl Instance {
    pub fn new(id: InstanceId, state: InstanceState) -> Self {
        Self {
            id,
            state,
            placement: None,
            public_dns: None,
            public_ip: None,
            launched_at: None,
            name: None,
        }
    }

    /// Address to reach the instance on: public DNS, else public IP.
    pub fn address(&self) -> Option<&str> {
        self.public_dns
            .as_deref()
            .filter(|dns| !dns.is_empty())
            .or(self.public_ip.as_deref())
    }
}

/// Parameters for launching one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInstanceRequest {
    pub ami: String,
    pub keypair: String,
    pub instance_type: String,
    pub security_groups: NonEmpty<String>,
    pub placement: Option<AvailabilityZone>,
}

impl RunInstanceRequest {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ami: config.ami_id.clone(),
            keypair: config.keypair_name.clone(),
            instance_type: config.instance_type.clone(),
            security_groups: config.security_group.clone(),
            placement: config.availability_zone.as_deref().map(AvailabilityZone::new),
        }
    }
}

/// A resource tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Snapshot of a load balancer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadBalancer {
    pub name: LoadBalancerName,
    pub zones: BTreeSet<AvailabilityZone>,
    pub instances: BTreeSet<InstanceId>,
    pub cross_zone: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_round_trip_provider_names() {
        for state in [
            InstanceState::Pending,
            InstanceState::Running,
            InstanceState::ShuttingDown,
            InstanceState::Stopping,
            InstanceState::Stopped,
            InstanceState::Terminated,
        ] {
            assert_eq!(InstanceState::parse(state.as_str()), Some(state));
        }
        assert_eq!(InstanceState::parse("rebooting"), None);
    }

    #[test]
    fn address_prefers_dns_and_skips_blank() {
        let mut instance = Instance::new(InstanceId::new("i-1"), InstanceState::Running);
        instance.public_ip = Some("54.1.2.3".to_string());
        instance.public_dns = Some(String::new());
        assert_eq!(instance.address(), Some("54.1.2.3"));

        instance.public_dns = Some("ec2-54-1-2-3.compute.amazonaws.com".to_string());
        assert_eq!(instance.address(), Some("ec2-54-1-2-3.compute.amazonaws.com"));
    }
}
