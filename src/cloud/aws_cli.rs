// ABOUTME: Cloud backend that drives the `aws` command line tool.
// ABOUTME: Credentials and region from the config are passed through the child environment.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt as _;
use tokio::process::Command;

use super::error::{ApiSnafu, CloudError, DecodeSnafu, SpawnSnafu};
use super::traits::{ComputeApi, LoadBalancerApi};
use super::types::{Instance, InstanceState, LoadBalancer, RunInstanceRequest, Tag};
use crate::config::{Config, Secret};
use crate::types::{AvailabilityZone, InstanceId, LoadBalancerName};

/// Error code the classic ELB API returns for an unknown name.
const LOAD_BALANCER_NOT_FOUND: &str = "LoadBalancerNotFound";

/// Runs `aws ec2 ...` and `aws elb ...` subcommands with JSON output.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: PathBuf,
    region: String,
    access_key_id: String,
    secret_access_key: Secret,
}

impl AwsCli {
    pub fn from_config(config: &Config) -> Self {
        Self {
            program: PathBuf::from("aws"),
            region: config.region.clone(),
            access_key_id: config.aws_access_key_id.clone(),
            secret_access_key: config.aws_secret_access_key.clone(),
        }
    }

    /// Use a different executable, e.g. a pinned install.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn call(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<String, CloudError> {
        tracing::debug!("aws {} {} {:?}", service, operation, args);

        let output = Command::new(&self.program)
            .arg(service)
            .arg(operation)
            .args(args)
            .args(["--output", "json", "--region", self.region.as_str()])
            .env("AWS_ACCESS_KEY_ID", &self.access_key_id)
            .env("AWS_SECRET_ACCESS_KEY", self.secret_access_key.expose())
            .env("AWS_DEFAULT_REGION", &self.region)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context(SpawnSnafu)?;

        if !output.status.success() {
            return ApiSnafu {
                operation: format!("{service} {operation}"),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .fail();
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        service: &str,
        operation: &str,
        args: &[String],
    ) -> Result<T, CloudError> {
        let body = self.call(service, operation, args).await?;
        serde_json::from_str(&body).context(DecodeSnafu {
            operation: format!("{service} {operation}"),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RunInstancesResponse {
    instances: Vec<InstanceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesResponse {
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    instances: Vec<InstanceDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceDescription {
    instance_id: String,
    state: StateDescription,
    #[serde(default)]
    placement: Option<PlacementDescription>,
    #[serde(default)]
    public_dns_name: Option<String>,
    #[serde(default)]
    public_ip_address: Option<String>,
    #[serde(default)]
    launch_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StateDescription {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PlacementDescription {
    #[serde(default)]
    availability_zone: Option<String>,
}

impl InstanceDescription {
    fn into_instance(self) -> Result<Instance, CloudError> {
        let state = InstanceState::parse(&self.state.name).ok_or_else(|| {
            ApiSnafu {
                operation: "ec2 describe-instances",
                message: format!("unknown instance state {:?}", self.state.name),
            }
            .build()
        })?;

        Ok(Instance {
            id: InstanceId::new(self.instance_id),
            state,
            placement: self
                .placement
                .and_then(|p| p.availability_zone)
                .map(AvailabilityZone::new),
            public_dns: self.public_dns_name.filter(|s| !s.is_empty()),
            public_ip: self.public_ip_address,
            launched_at: self.launch_time,
            name: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeLoadBalancersResponse {
    load_balancer_descriptions: Vec<LoadBalancerDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoadBalancerDescription {
    load_balancer_name: String,
    #[serde(default)]
    availability_zones: Vec<String>,
    #[serde(default)]
    instances: Vec<MemberDescription>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MemberDescription {
    instance_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AttributesResponse {
    load_balancer_attributes: Attributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Attributes {
    #[serde(default)]
    cross_zone_load_balancing: Option<Toggle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Toggle {
    enabled: bool,
}

fn tags_argument(tags: &[Tag]) -> String {
    let tags: Vec<_> = tags
        .iter()
        .map(|t| serde_json::json!({ "Key": t.key, "Value": t.value }))
        .collect();
    serde_json::Value::Array(tags).to_string()
}

#[async_trait]
impl ComputeApi for AwsCli {
    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<Instance, CloudError> {
        let mut args = vec![
            "--image-id".to_string(),
            request.ami.clone(),
            "--key-name".to_string(),
            request.keypair.clone(),
            "--instance-type".to_string(),
            request.instance_type.clone(),
            "--count".to_string(),
            "1".to_string(),
            "--security-groups".to_string(),
        ];
        args.extend(request.security_groups.iter().cloned());
        if let Some(zone) = &request.placement {
            args.push("--placement".to_string());
            args.push(format!("AvailabilityZone={zone}"));
        }

        let response: RunInstancesResponse = self.call_json("ec2", "run-instances", &args).await?;
        response
            .instances
            .into_iter()
            .next()
            .ok_or_else(|| {
                ApiSnafu {
                    operation: "ec2 run-instances",
                    message: "no instance in the reservation",
                }
                .build()
            })?
            .into_instance()
    }

    async fn describe_instance(&self, id: &InstanceId) -> Result<Instance, CloudError> {
        let args = vec!["--instance-ids".to_string(), id.to_string()];
        let response: DescribeInstancesResponse =
            self.call_json("ec2", "describe-instances", &args).await?;
        response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .next()
            .ok_or_else(|| {
                ApiSnafu {
                    operation: "ec2 describe-instances",
                    message: format!("instance {id} not found"),
                }
                .build()
            })?
            .into_instance()
    }

    async fn create_tags(&self, id: &InstanceId, tags: &[Tag]) -> Result<(), CloudError> {
        let args = vec![
            "--resources".to_string(),
            id.to_string(),
            "--tags".to_string(),
            tags_argument(tags),
        ];
        self.call("ec2", "create-tags", &args).await.map(drop)
    }
}

#[async_trait]
impl LoadBalancerApi for AwsCli {
    async fn describe_load_balancer(
        &self,
        name: &LoadBalancerName,
    ) -> Result<Option<LoadBalancer>, CloudError> {
        let args = vec!["--load-balancer-names".to_string(), name.to_string()];
        let response: DescribeLoadBalancersResponse =
            match self.call_json("elb", "describe-load-balancers", &args).await {
                Ok(response) => response,
                Err(CloudError::Api { message, .. })
                    if message.contains(LOAD_BALANCER_NOT_FOUND) =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

        let Some(description) = response.load_balancer_descriptions.into_iter().next() else {
            return Ok(None);
        };

        let args = vec!["--load-balancer-name".to_string(), name.to_string()];
        let attributes: AttributesResponse = self
            .call_json("elb", "describe-load-balancer-attributes", &args)
            .await?;

        Ok(Some(LoadBalancer {
            name: LoadBalancerName::new(description.load_balancer_name),
            zones: description
                .availability_zones
                .into_iter()
                .map(AvailabilityZone::new)
                .collect(),
            instances: description
                .instances
                .into_iter()
                .map(|m| InstanceId::new(m.instance_id))
                .collect(),
            cross_zone: attributes
                .load_balancer_attributes
                .cross_zone_load_balancing
                .is_some_and(|t| t.enabled),
        }))
    }

    async fn enable_cross_zone(&self, name: &LoadBalancerName) -> Result<(), CloudError> {
        let args = vec![
            "--load-balancer-name".to_string(),
            name.to_string(),
            "--load-balancer-attributes".to_string(),
            r#"{"CrossZoneLoadBalancing":{"Enabled":true}}"#.to_string(),
        ];
        self.call("elb", "modify-load-balancer-attributes", &args)
            .await
            .map(drop)
    }

    async fn enable_zone(
        &self,
        name: &LoadBalancerName,
        zone: &AvailabilityZone,
    ) -> Result<(), CloudError> {
        let args = vec![
            "--load-balancer-name".to_string(),
            name.to_string(),
            "--availability-zones".to_string(),
            zone.to_string(),
        ];
        self.call("elb", "enable-availability-zones-for-load-balancer", &args)
            .await
            .map(drop)
    }

    async fn register_instance(
        &self,
        name: &LoadBalancerName,
        instance: &InstanceId,
    ) -> Result<(), CloudError> {
        let args = vec![
            "--load-balancer-name".to_string(),
            name.to_string(),
            "--instances".to_string(),
            instance.to_string(),
        ];
        self.call("elb", "register-instances-with-load-balancer", &args)
            .await
            .map(drop)
    }
}
