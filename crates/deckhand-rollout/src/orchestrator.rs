//! Deploy orchestrator — create, destroy and list a service's units.
//!
//! Every call reads the current units fresh from fleet; the orchestrator
//! keeps no state between requests. Creating with `destroy_previous`
//! hands the new instances to a [`RolloutWatcher`] that retires each
//! previous instance once its replacement is running.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use deckhand_core::{
    Deploy, TARGET_LAUNCHED, Unit, UnitContext, UnitTemplate, VersionedUnit, current_timestamp,
    find_service_units, find_version_families,
};
use deckhand_fleet::FleetClient;

use crate::error::{RolloutError, RolloutResult};
use crate::events::{DeployEvent, EventEmitter, TracingEmitter};
use crate::handler::Destroyer;
use crate::policy::{previous_version, resolve_instance_count};
use crate::watcher::{RolloutWatcher, WatchConfig, WatchOutcome};

/// Result of a successful create.
#[derive(Debug)]
pub struct CreatedDeploy {
    /// The deploy as launched, with timestamp, count and predecessor filled in.
    pub deploy: Deploy,
    /// Unit names created and launched, in ordinal order.
    pub units: Vec<String>,
    /// Background watcher retiring the previous version, if one was started.
    pub watcher: Option<JoinHandle<WatchOutcome>>,
}

pub struct Orchestrator {
    fleet: Arc<dyn FleetClient>,
    template: UnitTemplate,
    image_prefix: String,
    watch: WatchConfig,
    emitter: Arc<dyn EventEmitter>,
    shutdown: watch::Receiver<bool>,
}

impl Orchestrator {
    pub fn new(fleet: Arc<dyn FleetClient>) -> Self {
        Self {
            fleet,
            template: UnitTemplate::default(),
            image_prefix: String::new(),
            watch: WatchConfig::default(),
            emitter: Arc::new(TracingEmitter),
            shutdown: watch::channel(false).1,
        }
    }

    pub fn with_template(mut self, template: UnitTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_image_prefix(mut self, image_prefix: impl Into<String>) -> Self {
        self.image_prefix = image_prefix.into();
        self
    }

    pub fn with_watch_config(mut self, watch: WatchConfig) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn EventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Watchers stop when this receiver sees `true`.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn fleet(&self) -> &Arc<dyn FleetClient> {
        &self.fleet
    }

    /// Launch a new deploy of `service`.
    ///
    /// Validation errors are returned before anything is written to fleet.
    /// A fleet error in the create/launch loop aborts it, leaving the units
    /// created so far in place.
    pub async fn create(&self, service: &str, request: Deploy) -> RolloutResult<CreatedDeploy> {
        let mut deploy = request;
        deploy.service_name = service.to_string();
        deploy.previous_version = None;
        deploy.instances.clear();
        validate_identity(&deploy)?;
        if deploy.timestamp.is_empty() {
            deploy.timestamp = current_timestamp();
        }

        let units = self.fleet.units().await?;
        let families = find_version_families(service, &units);
        let running = find_service_units(service, None, &units).len();

        if deploy.destroy_previous {
            deploy.previous_version =
                previous_version(&deploy, &families, running)?.map(Box::new);
        }
        deploy.instance_count = Some(resolve_instance_count(deploy.instance_count, &families));

        let options = self.template.render(&UnitContext {
            name: service,
            version: &deploy.version,
            image_prefix: &self.image_prefix,
            timestamp: &deploy.timestamp,
        })?;

        self.emitter.emit(&DeployEvent::started(&deploy));

        let mut launched = Vec::new();
        for instance in deploy.service_instances() {
            let name = instance.unit_name();
            info!(unit = %name, "creating unit");
            self.fleet
                .create_unit(&Unit::new(&name, options.clone()))
                .await?;
            info!(unit = %name, "launching unit");
            self.fleet.set_unit_target_state(&name, TARGET_LAUNCHED).await?;
            launched.push(name);
        }

        let watcher = match deploy.previous_version.as_deref() {
            Some(previous) => {
                info!(
                    service,
                    version = %deploy.version,
                    previous = %previous.version,
                    "watching rollout to destroy previous version"
                );
                let watcher = RolloutWatcher::new(deploy.clone(), self.fleet.clone(), self.watch)
                    .with_handler(Destroyer::new(previous.clone(), self.fleet.clone()));
                Some(watcher.spawn(self.shutdown.clone()))
            }
            None => {
                if deploy.destroy_previous {
                    debug!(service, "no previous version running, nothing to destroy");
                }
                None
            }
        };

        Ok(CreatedDeploy {
            deploy,
            units: launched,
            watcher,
        })
    }

    /// Destroy every unit of `service` at `version`, optionally only those
    /// deployed at `timestamp`. Returns the destroyed unit names.
    ///
    /// Units are destroyed one by one and the first failure is returned.
    pub async fn destroy(
        &self,
        service: &str,
        version: &str,
        timestamp: Option<&str>,
    ) -> RolloutResult<Vec<String>> {
        if version.is_empty() {
            return Err(RolloutError::InvalidDeploy("version is required".to_string()));
        }
        let timestamp = timestamp.filter(|t| !t.is_empty());

        let units = self.fleet.units().await?;
        let mut destroyed = Vec::new();
        for unit in find_service_units(service, Some(version), &units) {
            if timestamp.is_some_and(|t| t != unit.timestamp) {
                continue;
            }
            let name = unit.unit_name();
            info!(unit = %name, "destroying unit");
            self.fleet.destroy_unit(&name).await?;
            destroyed.push(name);
        }

        Ok(destroyed)
    }

    /// Every managed unit of `service`.
    pub async fn units(&self, service: &str) -> RolloutResult<Vec<VersionedUnit>> {
        let units = self.fleet.units().await?;
        Ok(find_service_units(service, None, &units))
    }
}

/// Reject identities that would not survive the unit name encoding.
fn validate_identity(deploy: &Deploy) -> RolloutResult<()> {
    let fields = [
        ("service name", deploy.service_name.as_str()),
        ("version", deploy.version.as_str()),
        ("timestamp", deploy.timestamp.as_str()),
    ];
    for (field, value) in fields {
        if value.contains([':', '@']) {
            return Err(RolloutError::InvalidDeploy(format!(
                "{field} must not contain ':' or '@': {value}"
            )));
        }
    }
    if deploy.service_name.is_empty() {
        return Err(RolloutError::InvalidDeploy("service name is required".to_string()));
    }
    if deploy.version.is_empty() {
        return Err(RolloutError::InvalidDeploy("version is required".to_string()));
    }
    Ok(())
}
