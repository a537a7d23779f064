//! Rollout error types.

use deckhand_core::CoreError;
use deckhand_fleet::FleetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RolloutError {
    /// More than one version family is running, so "previous" is ambiguous.
    #[error(
        "too many versions of {service} are running ({families}); destroying previous units is not supported when more than one version is running"
    )]
    TooManyVersions { service: String, families: usize },

    /// Shrinking while destroying the predecessor would under-provision.
    #[error(
        "{running} instances of {service} are already running but only {requested} were requested; request at least as many or disable destroy_previous"
    )]
    InsufficientInstances {
        service: String,
        requested: u32,
        running: usize,
    },

    #[error("invalid deploy: {0}")]
    InvalidDeploy(String),

    #[error("fleet: {0}")]
    Fleet(#[from] FleetError),

    #[error("unit template: {0}")]
    Template(#[from] CoreError),
}

impl RolloutError {
    /// Whether the request itself was rejected before touching fleet.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RolloutError::TooManyVersions { .. }
                | RolloutError::InsufficientInstances { .. }
                | RolloutError::InvalidDeploy(_)
        )
    }
}

pub type RolloutResult<T> = Result<T, RolloutError>;
