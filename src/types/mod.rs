// ABOUTME: Type-safe identifiers for cloud resources.
// ABOUTME: Instance ids, load balancer names and zones as distinct types.

mod id;

pub use id::{AvailabilityZone, Id, InstanceId, LoadBalancerName};
