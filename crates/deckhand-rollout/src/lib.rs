//! Deckhand rollouts — launching new versions and retiring old ones.
//!
//! A create request flows through the crate like this:
//!
//! ```text
//! Orchestrator::create
//!   ├── fleet.units()            fresh view of the cluster
//!   ├── policy                   instance count, destroy-previous checks
//!   ├── UnitTemplate::render     unit options, once per deploy
//!   ├── create + launch          one unit per ordinal
//!   └── RolloutWatcher::spawn    only with destroy_previous
//!         └── Destroyer          retires the previous unit at the same ordinal
//! ```
//!
//! # Components
//!
//! - **`orchestrator`** — create, destroy and list a service's units
//! - **`policy`** — instance count resolution and destroy-previous validation
//! - **`watcher`** — per-rollout poller confirming units reach `running`
//! - **`handler`** — completion handlers run for confirmed instances
//! - **`events`** — deploy lifecycle events

pub mod error;
pub mod events;
pub mod handler;
pub mod orchestrator;
pub mod policy;
pub mod watcher;

pub use error::{RolloutError, RolloutResult};
pub use events::{DeployEvent, EventEmitter, TracingEmitter};
pub use handler::{CompletionHandler, Destroyer, Event, FnHandler, handler_fn};
pub use orchestrator::{CreatedDeploy, Orchestrator};
pub use policy::resolve_instance_count;
pub use watcher::{RolloutWatcher, WatchConfig, WatchOutcome};
