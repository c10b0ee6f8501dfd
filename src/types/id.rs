// ABOUTME: Phantom-typed identifiers for cloud resources.
// ABOUTME: Keeps instance ids, load balancer names and zones from being swapped.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

pub enum InstanceMarker {}
pub enum LoadBalancerMarker {}
pub enum ZoneMarker {}

/// A provider-assigned name tagged with the kind of resource it names.
#[must_use = "ids name cloud resources"]
pub struct Id<T> {
    value: String,
    _kind: PhantomData<T>,
}

pub type InstanceId = Id<InstanceMarker>;
pub type LoadBalancerName = Id<LoadBalancerMarker>;
pub type AvailabilityZone = Id<ZoneMarker>;

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

// Manual impls: the derives would demand the same traits of the marker.

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.value).finish()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(InstanceId::new("i-1"), InstanceId::new("i-1".to_string()));
        assert_ne!(InstanceId::new("i-1"), InstanceId::new("i-2"));
    }

    #[test]
    fn zones_order_for_sets() {
        let zones: BTreeSet<_> = ["us-west-2b", "us-west-2a"]
            .into_iter()
            .map(AvailabilityZone::new)
            .collect();
        let ordered: Vec<_> = zones.iter().map(|z| z.as_str()).collect();
        assert_eq!(ordered, vec!["us-west-2a", "us-west-2b"]);
    }

    #[test]
    fn display_is_the_bare_value() {
        assert_eq!(LoadBalancerName::new("couch-lb").to_string(), "couch-lb");
    }
}
