//! Completion handlers run when a watched instance is confirmed running.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use deckhand_core::{Deploy, ServiceInstance, UnitState};
use deckhand_fleet::FleetClient;

/// A watched instance paired with the state it was last observed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub instance: ServiceInstance,
    pub state: UnitState,
}

impl Event {
    pub fn new(instance: ServiceInstance, state: UnitState) -> Self {
        Self { instance, state }
    }

    pub fn unit_name(&self) -> String {
        self.instance.unit_name()
    }
}

/// Callback invoked once per confirmed instance, in registration order.
///
/// Handlers cannot fail the rollout; they report their own errors.
#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn handle(&self, event: &Event);
}

/// Destroys the previous deploy's instance paired with the confirmed one.
///
/// Ordinals pair by position among the previous deploy's observed
/// instances, see [`Deploy::paired_instance`].
pub struct Destroyer {
    previous: Deploy,
    fleet: Arc<dyn FleetClient>,
}

impl Destroyer {
    pub fn new(previous: Deploy, fleet: Arc<dyn FleetClient>) -> Self {
        Self { previous, fleet }
    }

    pub fn previous(&self) -> &Deploy {
        &self.previous
    }
}

#[async_trait]
impl CompletionHandler for Destroyer {
    async fn handle(&self, event: &Event) {
        let Some(ordinal) = self.previous.paired_instance(&event.instance.instance) else {
            debug!(
                replacement = %event.instance,
                "no previous instance paired with launched instance"
            );
            return;
        };
        let marked = self.previous.service_instance(&ordinal).unit_name();
        info!(
            unit = %marked,
            replacement = %event.instance,
            "destroying unit replaced by launched instance"
        );
        if let Err(e) = self.fleet.destroy_unit(&marked).await {
            warn!(unit = %marked, error = %e, "failed to destroy replaced unit");
        }
    }
}

/// Adapts a plain closure into a [`CompletionHandler`].
pub struct FnHandler<F>(F);

/// Wrap `f` as a completion handler.
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CompletionHandler for FnHandler<F>
where
    F: Fn(&Event) + Send + Sync,
{
    async fn handle(&self, event: &Event) {
        (self.0)(event)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use deckhand_fleet::MemoryFleet;

    fn running_event(deploy: &Deploy, instance: &str) -> Event {
        let instance = deploy.service_instance(instance);
        let state = UnitState::with_sub_state(&instance.unit_name(), "running");
        Event::new(instance, state)
    }

    #[tokio::test]
    async fn destroys_previous_instance_at_same_ordinal() {
        let fleet = Arc::new(MemoryFleet::with_units([
            "carousel:v1:t0@1.service",
            "carousel:v1:t0@2.service",
        ]));
        let mut previous = Deploy::new("carousel", "v1", "t0");
        previous.instance_count = Some(2);
        let destroyer = Destroyer::new(previous, fleet.clone());

        let current = Deploy::new("carousel", "v2", "t1");
        destroyer.handle(&running_event(&current, "2")).await;

        assert_eq!(fleet.destroyed(), vec!["carousel:v1:t0@2.service"]);
        assert_eq!(fleet.unit_names(), vec!["carousel:v1:t0@1.service"]);
    }

    #[tokio::test]
    async fn pairs_across_gaps_in_previous_ordinals() {
        let fleet = Arc::new(MemoryFleet::with_units([
            "carousel:v1:t0@2.service",
            "carousel:v1:t0@3.service",
        ]));
        let mut previous = Deploy::new("carousel", "v1", "t0");
        previous.instance_count = Some(2);
        previous.instances = vec!["2".to_string(), "3".to_string()];
        let destroyer = Destroyer::new(previous, fleet.clone());

        let current = Deploy::new("carousel", "v2", "t1");
        for ordinal in ["1", "2", "3"] {
            destroyer.handle(&running_event(&current, ordinal)).await;
        }

        assert_eq!(
            fleet.destroyed(),
            vec!["carousel:v1:t0@2.service", "carousel:v1:t0@3.service"]
        );
        assert!(fleet.unit_names().is_empty());
    }

    #[tokio::test]
    async fn swallows_destroy_errors() {
        let fleet = Arc::new(MemoryFleet::with_units(["carousel:v1:t0@1.service"]));
        fleet.fail_destroy("carousel:v1:t0@1.service");
        let destroyer = Destroyer::new(Deploy::new("carousel", "v1", "t0"), fleet.clone());

        destroyer
            .handle(&running_event(&Deploy::new("carousel", "v2", "t1"), "1"))
            .await;

        assert_eq!(fleet.destroyed(), vec!["carousel:v1:t0@1.service"]);
        assert_eq!(fleet.unit_names(), vec!["carousel:v1:t0@1.service"]);
    }

    #[tokio::test]
    async fn closure_handler_sees_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler = handler_fn(move |e: &Event| sink.lock().unwrap().push(e.unit_name()));

        handler
            .handle(&running_event(&Deploy::new("app", "v1", "t0"), "1"))
            .await;

        assert_eq!(*seen.lock().unwrap(), vec!["app:v1:t0@1.service"]);
    }
}
