//! Listing read-model over fleet units.
//!
//! Fleet does not know about versions; these helpers explode the identity
//! encoded in each managed unit name into proper fields and group a
//! service's units into version families.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Deploy, Unit};
use crate::unit_name;

/// A fleet unit with its Deckhand identity decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedUnit {
    pub service: String,
    pub instance: String,
    pub version: String,
    #[serde(rename = "deploy_timestamp")]
    pub timestamp: String,
    pub current_state: String,
    pub desired_state: String,
    pub machine_id: String,
}

impl VersionedUnit {
    /// Decode a fleet unit, or `None` if its name is not managed.
    pub fn from_unit(unit: &Unit) -> Option<Self> {
        let name = unit_name::decode(&unit.name)?;
        Some(Self {
            service: name.service.to_string(),
            instance: name.instance.to_string(),
            version: name.version.to_string(),
            timestamp: name.timestamp.to_string(),
            current_state: unit.current_state.clone(),
            desired_state: unit.desired_state.clone(),
            machine_id: unit.machine_id.clone(),
        })
    }

    /// The fleet unit name this row was decoded from.
    pub fn unit_name(&self) -> String {
        unit_name::encode(&self.service, &self.version, &self.timestamp, &self.instance)
    }
}

/// All managed units of `service`, optionally restricted to one version.
///
/// A `None` or blank version matches every version. Unmanaged units are
/// skipped.
pub fn find_service_units(
    service: &str,
    version: Option<&str>,
    units: &[Unit],
) -> Vec<VersionedUnit> {
    let version = version.filter(|v| !v.is_empty());
    units
        .iter()
        .filter_map(VersionedUnit::from_unit)
        .filter(|u| u.service == service)
        .filter(|u| version.is_none_or(|v| u.version == v))
        .collect()
}

/// One deployed (version, timestamp) pair of a service and its instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFamily {
    pub version: String,
    pub timestamp: String,
    /// Instance ordinals, in ascending order.
    pub instances: Vec<String>,
}

impl VersionFamily {
    /// Describe this family as the deploy that created it, keeping the
    /// ordinals actually present.
    pub fn to_deploy(&self, service: &str) -> Deploy {
        let mut deploy = Deploy::new(service, &self.version, &self.timestamp);
        deploy.instance_count = Some(self.instances.len() as u32);
        deploy.instances = self.instances.clone();
        deploy
    }
}

/// Distinct version families of `service` currently known to fleet.
///
/// The same version deployed at two timestamps is two families. Families
/// are ordered by timestamp, then version.
pub fn find_version_families(service: &str, units: &[Unit]) -> Vec<VersionFamily> {
    let mut families: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();
    for unit in find_service_units(service, None, units) {
        families
            .entry((unit.timestamp, unit.version))
            .or_default()
            .push(unit.instance);
    }

    families
        .into_iter()
        .map(|((timestamp, version), mut instances)| {
            instances.sort_by_key(|i| (i.parse::<u64>().unwrap_or(u64::MAX), i.clone()));
            VersionFamily {
                version,
                timestamp,
                instances,
            }
        })
        .collect()
}
