// ABOUTME: Capability traits for the cloud provider.
// ABOUTME: ComputeApi launches and tags instances; LoadBalancerApi manages ELB membership.

use async_trait::async_trait;

use super::error::CloudError;
use super::types::{Instance, LoadBalancer, RunInstanceRequest, Tag};
use crate::types::{AvailabilityZone, InstanceId, LoadBalancerName};

/// Compute operations: launch, describe and tag instances.
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Launch exactly one instance.
    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<Instance, CloudError>;

    /// Fetch a fresh snapshot of the instance.
    async fn describe_instance(&self, id: &InstanceId) -> Result<Instance, CloudError>;

    /// Apply tags to the instance.
    async fn create_tags(&self, id: &InstanceId, tags: &[Tag]) -> Result<(), CloudError>;
}

/// Load balancer operations.
#[async_trait]
pub trait LoadBalancerApi: Send + Sync {
    /// Look up a load balancer by name. `None` when it does not exist.
    async fn describe_load_balancer(
        &self,
        name: &LoadBalancerName,
    ) -> Result<Option<LoadBalancer>, CloudError>;

    /// Turn on cross-zone balancing.
    async fn enable_cross_zone(&self, name: &LoadBalancerName) -> Result<(), CloudError>;

    /// Add an availability zone to the load balancer.
    async fn enable_zone(
        &self,
        name: &LoadBalancerName,
        zone: &AvailabilityZone,
    ) -> Result<(), CloudError>;

    /// Register an instance behind the load balancer.
    async fn register_instance(
        &self,
        name: &LoadBalancerName,
        instance: &InstanceId,
    ) -> Result<(), CloudError>;
}
