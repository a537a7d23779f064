//! In-memory fleet for tests and local runs.
//!
//! Keeps units and their reported states in maps, records every call in
//! order, and can be told to fail specific operations.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use deckhand_core::{TARGET_INACTIVE, Unit, UnitState};

use crate::client::FleetClient;
use crate::error::{FleetError, FleetResult};

/// One call made against a [`MemoryFleet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetCall {
    Units,
    CreateUnit(String),
    DestroyUnit(String),
    UnitStates,
    SetTargetState(String, String),
}

#[derive(Debug, Default)]
struct Inner {
    units: BTreeMap<String, Unit>,
    states: BTreeMap<String, UnitState>,
    calls: Vec<FleetCall>,
    fail_units: bool,
    /// Remaining `unit_states` calls that fail.
    fail_states: usize,
    fail_create: HashSet<String>,
    fail_destroy: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryFleet {
    inner: Mutex<Inner>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fleet already running the given units.
    pub fn with_units<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fleet = Self::new();
        for name in names {
            fleet.insert_unit(name.as_ref(), "launched");
        }
        fleet
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a unit without recording a call.
    pub fn insert_unit(&self, name: &str, state: &str) {
        let unit = Unit {
            current_state: state.to_string(),
            desired_state: state.to_string(),
            machine_id: "machine-1".to_string(),
            ..Unit::new(name, Vec::new())
        };
        self.lock().units.insert(name.to_string(), unit);
    }

    /// Report `sub_state` for `name` on subsequent state polls.
    pub fn set_sub_state(&self, name: &str, sub_state: &str) {
        self.lock()
            .states
            .insert(name.to_string(), UnitState::with_sub_state(name, sub_state));
    }

    pub fn fail_units(&self) {
        self.lock().fail_units = true;
    }

    /// Fail the next `n` state polls.
    pub fn fail_states(&self, n: usize) {
        self.lock().fail_states = n;
    }

    pub fn fail_create(&self, name: &str) {
        self.lock().fail_create.insert(name.to_string());
    }

    pub fn fail_destroy(&self, name: &str) {
        self.lock().fail_destroy.insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<FleetCall> {
        self.lock().calls.clone()
    }

    pub fn unit_names(&self) -> Vec<String> {
        self.lock().units.keys().cloned().collect()
    }

    pub fn unit(&self, name: &str) -> Option<Unit> {
        self.lock().units.get(name).cloned()
    }

    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FleetCall::CreateUnit(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                FleetCall::DestroyUnit(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn launched(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                FleetCall::SetTargetState(name, state) if state == "launched" => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&FleetCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| matches(c)).count()
    }
}

fn injected(what: &str, name: &str) -> FleetError {
    FleetError::Status {
        status: 500,
        body: format!("injected {what} failure for {name}"),
    }
}

#[async_trait]
impl FleetClient for MemoryFleet {
    async fn units(&self) -> FleetResult<Vec<Unit>> {
        let mut inner = self.lock();
        inner.calls.push(FleetCall::Units);
        if inner.fail_units {
            return Err(injected("list", "units"));
        }
        Ok(inner.units.values().cloned().collect())
    }

    async fn create_unit(&self, unit: &Unit) -> FleetResult<()> {
        let mut inner = self.lock();
        inner.calls.push(FleetCall::CreateUnit(unit.name.clone()));
        if inner.fail_create.contains(&unit.name) {
            return Err(injected("create", &unit.name));
        }
        let mut stored = unit.clone();
        if stored.desired_state.is_empty() {
            stored.desired_state = TARGET_INACTIVE.to_string();
        }
        inner.units.insert(unit.name.clone(), stored);
        Ok(())
    }

    async fn destroy_unit(&self, name: &str) -> FleetResult<()> {
        let mut inner = self.lock();
        inner.calls.push(FleetCall::DestroyUnit(name.to_string()));
        if inner.fail_destroy.contains(name) {
            return Err(injected("destroy", name));
        }
        inner.states.remove(name);
        match inner.units.remove(name) {
            Some(_) => Ok(()),
            None => Err(FleetError::Status {
                status: 404,
                body: format!("unit {name} does not exist"),
            }),
        }
    }

    async fn unit_states(&self) -> FleetResult<Vec<UnitState>> {
        let mut inner = self.lock();
        inner.calls.push(FleetCall::UnitStates);
        if inner.fail_states > 0 {
            inner.fail_states -= 1;
            return Err(injected("state", "units"));
        }
        Ok(inner.states.values().cloned().collect())
    }

    async fn set_unit_target_state(&self, name: &str, state: &str) -> FleetResult<()> {
        let mut inner = self.lock();
        inner
            .calls
            .push(FleetCall::SetTargetState(name.to_string(), state.to_string()));
        match inner.units.get_mut(name) {
            Some(unit) => {
                unit.desired_state = state.to_string();
                Ok(())
            }
            None => Err(FleetError::Status {
                status: 404,
                body: format!("unit {name} does not exist"),
            }),
        }
    }
}
