//! deckhand-fleet — client for the fleet cluster scheduler.
//!
//! Deckhand never places workloads itself. Everything it knows about the
//! cluster comes from fleet, and every change it makes goes through the
//! five operations of [`FleetClient`].
//!
//! # Architecture
//!
//! ```text
//! FleetClient (trait, Arc<dyn FleetClient>)
//!   ├── HttpFleetClient
//!   │   ├── FleetEndpoint (unix socket or TCP)
//!   │   ├── one HTTP/1 connection per request
//!   │   └── nextPageToken pagination for list calls
//!   └── MemoryFleet (in-process, records calls)
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod http_client;
pub mod memory;

pub use client::FleetClient;
pub use endpoint::FleetEndpoint;
pub use error::{FleetError, FleetResult};
pub use http_client::HttpFleetClient;
pub use memory::{FleetCall, MemoryFleet};
