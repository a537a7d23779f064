//! deckhand-core — shared types for the Deckhand rollout orchestrator.
//!
//! - **`types`** — deploys, service instances, and the fleet unit wire types
//! - **`unit_name`** — encoding and decoding of managed unit names
//! - **`versioned_unit`** — listing read-model and version family discovery
//! - **`template`** — unit file rendering into fleet unit options
//! - **`config`** — `deckhand.toml` daemon configuration

pub mod config;
pub mod error;
pub mod template;
pub mod types;
pub mod unit_name;
pub mod versioned_unit;

pub use config::DeckhandConfig;
pub use error::{CoreError, CoreResult};
pub use template::{UnitContext, UnitTemplate};
pub use types::*;
pub use unit_name::UnitName;
pub use versioned_unit::{VersionFamily, VersionedUnit, find_service_units, find_version_families};
