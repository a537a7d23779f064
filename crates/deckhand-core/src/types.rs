//! Shared types used across Deckhand crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format of deploy timestamps embedded in unit names, e.g. `2006.01.02-15.04.05`.
///
/// Lexicographic order of formatted timestamps matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H.%M.%S";

/// Target state that asks fleet to schedule and start a unit.
pub const TARGET_LAUNCHED: &str = "launched";

/// Desired state a unit is created with before being launched.
pub const TARGET_INACTIVE: &str = "inactive";

/// Format a point in time as a deploy timestamp.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// The deploy timestamp for "now", in UTC.
pub fn current_timestamp() -> String {
    format_timestamp(Utc::now())
}

// ── Deploys ────────────────────────────────────────────────────

/// One request to launch N instances of a given service version.
///
/// Built from the inbound create request and then filled in by the
/// orchestrator (service name, timestamp, resolved instance count, and the
/// version being retired when `destroy_previous` is in effect). The service
/// name and predecessor are never taken from a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
    #[serde(default, skip_deserializing, skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    pub version: String,
    #[serde(default)]
    pub destroy_previous: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    /// Requested instance count. `None` (or zero) lets policy decide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_count: Option<u32>,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<Box<Deploy>>,
    /// Ordinals observed in fleet for an already deployed family. Empty for
    /// a deploy that has not been launched yet.
    #[serde(skip)]
    pub instances: Vec<String>,
}

impl Deploy {
    /// Create a deploy for a service version at a fixed timestamp.
    pub fn new(service_name: &str, version: &str, timestamp: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            version: version.to_string(),
            timestamp: timestamp.to_string(),
            ..Default::default()
        }
    }

    /// The instance of this deploy at the given ordinal.
    pub fn service_instance(&self, instance: &str) -> ServiceInstance {
        ServiceInstance {
            name: self.service_name.clone(),
            version: self.version.clone(),
            timestamp: self.timestamp.clone(),
            instance: instance.to_string(),
        }
    }

    /// All instances `1..=instance_count` of this deploy.
    pub fn service_instances(&self) -> Vec<ServiceInstance> {
        let count = self.instance_count.unwrap_or(0);
        (1..=count)
            .map(|i| self.service_instance(&i.to_string()))
            .collect()
    }

    /// The ordinal of this deploy paired with ordinal `n` (1-based) of a
    /// replacement.
    ///
    /// Without observed ordinals the pairing is by equal ordinal. With them,
    /// the n-th observed ordinal is used, so gaps left by earlier failures
    /// are skipped. `None` when this deploy has no n-th instance.
    pub fn paired_instance(&self, n: &str) -> Option<String> {
        if self.instances.is_empty() {
            return Some(n.to_string());
        }
        let index = n.parse::<usize>().ok()?.checked_sub(1)?;
        self.instances.get(index).cloned()
    }

    /// Requested instance count, treating zero as "not given".
    pub fn requested_instances(&self) -> Option<u32> {
        self.instance_count.filter(|n| *n > 0)
    }
}

/// A single unit of a possibly many-unit deploy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub name: String,
    pub version: String,
    pub timestamp: String,
    /// 1-based ordinal, kept as a string as it appears in the unit name.
    pub instance: String,
}

impl ServiceInstance {
    /// The fleet unit name encoding all four fields.
    ///
    /// `carousel:abc123:2006.01.02-15.04.05@1.service`
    pub fn unit_name(&self) -> String {
        crate::unit_name::encode(&self.name, &self.version, &self.timestamp, &self.instance)
    }

    /// Decode an instance from a managed unit name.
    pub fn from_unit_name(name: &str) -> Option<Self> {
        let decoded = crate::unit_name::decode(name)?;
        Some(Self {
            name: decoded.service.to_string(),
            version: decoded.version.to_string(),
            timestamp: decoded.timestamp.to_string(),
            instance: decoded.instance.to_string(),
        })
    }
}

impl std::fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.unit_name())
    }
}

// ── Fleet wire types ───────────────────────────────────────────

/// A single option of a fleet unit file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOption {
    pub section: String,
    pub name: String,
    pub value: String,
}

impl UnitOption {
    pub fn new(section: &str, name: &str, value: &str) -> Self {
        Self {
            section: section.to_string(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// A unit as known to fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub name: String,
    #[serde(default)]
    pub options: Vec<UnitOption>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_state: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub desired_state: String,
    #[serde(default, rename = "machineID", skip_serializing_if = "String::is_empty")]
    pub machine_id: String,
}

impl Unit {
    /// A unit with the given name and options and no reported state.
    pub fn new(name: &str, options: Vec<UnitOption>) -> Self {
        Self {
            name: name.to_string(),
            options,
            ..Default::default()
        }
    }
}

/// Runtime state of a unit as reported by systemd through fleet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    pub name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default, rename = "machineID")]
    pub machine_id: String,
    #[serde(default, rename = "systemdLoadState")]
    pub load_state: String,
    #[serde(default, rename = "systemdActiveState")]
    pub active_state: String,
    #[serde(default, rename = "systemdSubState")]
    pub sub_state: String,
}

impl UnitState {
    /// A state with only the name and sub-state set.
    pub fn with_sub_state(name: &str, sub_state: &str) -> Self {
        Self {
            name: name.to_string(),
            sub_state: sub_state.to_string(),
            ..Default::default()
        }
    }

    pub fn classify(&self) -> SubState {
        SubState::classify(&self.sub_state)
    }
}

/// The three classes a systemd sub-state falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubState {
    /// The unit is up.
    Running,
    /// The unit failed to start; terminal.
    Failed,
    /// Anything else (launching, start-pre, dead, ...).
    Pending,
}

impl SubState {
    pub fn classify(sub_state: &str) -> Self {
        match sub_state {
            "running" => SubState::Running,
            "failed" => SubState::Failed,
            _ => SubState::Pending,
        }
    }
}
