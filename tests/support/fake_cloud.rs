// ABOUTME: Scripted in-memory cloud implementing ComputeApi and LoadBalancerApi.
// ABOUTME: Instance states are replayed from a script; every call is recorded.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use spandex::cloud::{
    CloudError, ComputeApi, Instance, InstanceState, LoadBalancer, LoadBalancerApi,
    RunInstanceRequest, Tag,
};
use spandex::types::{AvailabilityZone, InstanceId, LoadBalancerName};

struct CloudState {
    /// States reported by run_instance and then each describe; the last one repeats.
    script: VecDeque<InstanceState>,
    placement: Option<AvailabilityZone>,
    requests: Vec<RunInstanceRequest>,
    describes: u32,
    tags: Vec<(InstanceId, Tag)>,
    balancers: BTreeMap<String, LoadBalancer>,
    calls: Vec<String>,
    fail_registration: bool,
}

pub struct FakeCloud {
    state: Mutex<CloudState>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self::with_states(&[InstanceState::Pending, InstanceState::Running])
    }
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_states(states: &[InstanceState]) -> Self {
        Self {
            state: Mutex::new(CloudState {
                script: states.iter().copied().collect(),
                placement: Some(AvailabilityZone::new("us-west-2a")),
                requests: Vec::new(),
                describes: 0,
                tags: Vec::new(),
                balancers: BTreeMap::new(),
                calls: Vec::new(),
                fail_registration: false,
            }),
        }
    }

    pub fn with_load_balancer(mut self, name: &str, zones: &[&str], cross_zone: bool) -> Self {
        self.state.get_mut().balancers.insert(
            name.to_string(),
            LoadBalancer {
                name: LoadBalancerName::new(name),
                zones: zones.iter().copied().map(AvailabilityZone::new).collect(),
                instances: BTreeSet::new(),
                cross_zone,
            },
        );
        self
    }

    pub fn failing_registration(mut self) -> Self {
        self.state.get_mut().fail_registration = true;
        self
    }

    pub fn requests(&self) -> Vec<RunInstanceRequest> {
        self.state.lock().requests.clone()
    }

    pub fn describe_count(&self) -> u32 {
        self.state.lock().describes
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.state.lock().tags.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn load_balancer(&self, name: &str) -> Option<LoadBalancer> {
        self.state.lock().balancers.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    fn instance(state: &mut CloudState) -> Instance {
        let current = if state.script.len() > 1 {
            state.script.pop_front()
        } else {
            state.script.front().copied()
        };
        let mut instance = Instance::new(
            InstanceId::new("i-0123456789abcdef0"),
            current.unwrap_or(InstanceState::Running),
        );
        instance.placement = state.placement.clone();
        instance.public_dns = Some("ec2-54-1-2-3.us-west-2.compute.amazonaws.com".to_string());
        instance.public_ip = Some("54.1.2.3".to_string());
        instance
    }
}

#[async_trait]
impl ComputeApi for FakeCloud {
    async fn run_instance(&self, request: &RunInstanceRequest) -> Result<Instance, CloudError> {
        let mut state = self.state.lock();
        state.calls.push("run_instance".to_string());
        state.requests.push(request.clone());
        Ok(Self::instance(&mut state))
    }

    async fn describe_instance(&self, _id: &InstanceId) -> Result<Instance, CloudError> {
        let mut state = self.state.lock();
        state.calls.push("describe_instance".to_string());
        state.describes += 1;
        Ok(Self::instance(&mut state))
    }

    async fn create_tags(&self, id: &InstanceId, tags: &[Tag]) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        state.calls.push("create_tags".to_string());
        state
            .tags
            .extend(tags.iter().map(|t| (id.clone(), t.clone())));
        Ok(())
    }
}

#[async_trait]
impl LoadBalancerApi for FakeCloud {
    async fn describe_load_balancer(
        &self,
        name: &LoadBalancerName,
    ) -> Result<Option<LoadBalancer>, CloudError> {
        let mut state = self.state.lock();
        state.calls.push(format!("describe_load_balancer {name}"));
        Ok(state.balancers.get(name.as_str()).cloned())
    }

    async fn enable_cross_zone(&self, name: &LoadBalancerName) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        state.calls.push(format!("enable_cross_zone {name}"));
        if let Some(lb) = state.balancers.get_mut(name.as_str()) {
            lb.cross_zone = true;
        }
        Ok(())
    }

    async fn enable_zone(
        &self,
        name: &LoadBalancerName,
        zone: &AvailabilityZone,
    ) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        state.calls.push(format!("enable_zone {name} {zone}"));
        if let Some(lb) = state.balancers.get_mut(name.as_str()) {
            lb.zones.insert(zone.clone());
        }
        Ok(())
    }

    async fn register_instance(
        &self,
        name: &LoadBalancerName,
        instance: &InstanceId,
    ) -> Result<(), CloudError> {
        let mut state = self.state.lock();
        state.calls.push(format!("register_instance {name} {instance}"));
        if state.fail_registration {
            return Err(CloudError::NotFound {
                name: instance.to_string(),
            });
        }
        if let Some(lb) = state.balancers.get_mut(name.as_str()) {
            lb.instances.insert(instance.clone());
        }
        Ok(())
    }
}
