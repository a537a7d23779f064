//! Deploy lifecycle events.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use deckhand_core::Deploy;

/// Event emitted when a deploy starts launching units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub service_name: String,
    pub version: String,
    pub timestamp: String,
    pub instance_count: u32,
}

impl DeployEvent {
    pub const STARTED: &'static str = "started";

    pub fn started(deploy: &Deploy) -> Self {
        Self {
            kind: Self::STARTED.to_string(),
            service_name: deploy.service_name.clone(),
            version: deploy.version.clone(),
            timestamp: deploy.timestamp.clone(),
            instance_count: deploy.instance_count.unwrap_or(0),
        }
    }
}

/// Sink for deploy events. Emitting never fails the deploy.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &DeployEvent);
}

/// Writes events as JSON to the `deckhand::events` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
    fn emit(&self, event: &DeployEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                info!(target: "deckhand::events", kind = "deploy", %payload, "deploy event")
            }
            Err(e) => {
                warn!(target: "deckhand::events", error = %e, "failed to encode deploy event")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_event_serializes_with_type() {
        let mut deploy = Deploy::new("carousel", "abc123", "2006.01.02-15.04.05");
        deploy.instance_count = Some(2);

        let json = serde_json::to_value(DeployEvent::started(&deploy)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "started",
                "service_name": "carousel",
                "version": "abc123",
                "timestamp": "2006.01.02-15.04.05",
                "instance_count": 2,
            })
        );
    }
}
