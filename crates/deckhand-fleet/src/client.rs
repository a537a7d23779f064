//! The cluster scheduler seam.

use async_trait::async_trait;

use deckhand_core::{Unit, UnitState};

use crate::error::FleetResult;

/// Operations Deckhand needs from the cluster scheduler.
///
/// Implementations must be safe to share between concurrent requests and
/// rollout watchers; every call is independent.
#[async_trait]
pub trait FleetClient: Send + Sync {
    /// List every unit known to fleet, managed or not.
    async fn units(&self) -> FleetResult<Vec<Unit>>;

    /// Register a unit with its options. The unit is not started.
    async fn create_unit(&self, unit: &Unit) -> FleetResult<()>;

    /// Remove a unit from the cluster, stopping it if running.
    async fn destroy_unit(&self, name: &str) -> FleetResult<()>;

    /// Current systemd state of every scheduled unit.
    async fn unit_states(&self) -> FleetResult<Vec<UnitState>>;

    /// Change the desired state of a unit (`inactive`, `loaded`, `launched`).
    async fn set_unit_target_state(&self, name: &str, state: &str) -> FleetResult<()>;
}
