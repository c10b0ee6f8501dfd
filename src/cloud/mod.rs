// ABOUTME: Cloud compute and load balancer operations.
// ABOUTME: Instance provisioning with bounded polling, and best-effort ELB registration.

mod aws_cli;
mod error;
mod provision;
mod registrar;
mod traits;
mod types;

pub use aws_cli::AwsCli;
pub use error::{CloudError, CloudErrorKind};
pub use provision::{NAME_INFIX, PollConfig, Provisioner, instance_name, random_suffix};
pub use registrar::{RegistrationOutcome, register};
pub use traits::{ComputeApi, LoadBalancerApi};
pub use types::{Instance, InstanceState, LoadBalancer, RunInstanceRequest, Tag};
