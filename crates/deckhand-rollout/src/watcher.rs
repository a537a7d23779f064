//! Rollout watcher: confirms that a deploy's instances reach `running`.
//!
//! One watcher runs per in-flight rollout, on its own task. It owns the
//! set of instances not yet confirmed and shrinks it on every poll:
//!
//! ```text
//!             ┌──────── poll tick (delay) ────────┐
//!             ▼                                   │
//!   unit_states() ── running ──► handlers, remove ─┤
//!             │  ─── failed ──► remove ────────────┤
//!             │  ─── other ───► keep ──────────────┘
//!             │
//!   empty ──► Done   deadline ──► TimedOut   shutdown ──► Stopped
//! ```
//!
//! Handlers only ever run for instances observed running. Instances that
//! time out or fail are left alone, so the previous version keeps serving.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use deckhand_core::config::DeployConfig;
use deckhand_core::{Deploy, ServiceInstance, SubState};
use deckhand_fleet::{FleetClient, FleetResult};

use crate::handler::{CompletionHandler, Event};

/// Poll timing of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Wait between two state polls.
    pub delay: Duration,
    /// Wall-clock limit from watcher start.
    pub timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl From<&DeployConfig> for WatchConfig {
    fn from(config: &DeployConfig) -> Self {
        Self {
            delay: config.poll_interval(),
            timeout: config.watch_timeout(),
        }
    }
}

/// How a watcher finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Every instance was confirmed running or reported failed.
    Done,
    /// The deadline passed; carries the unit names still unresolved.
    TimedOut(Vec<String>),
    /// Shutdown was requested; carries the unit names still unresolved.
    Stopped(Vec<String>),
}

pub struct RolloutWatcher {
    deploy: Deploy,
    fleet: Arc<dyn FleetClient>,
    config: WatchConfig,
    handlers: Vec<Box<dyn CompletionHandler>>,
    unresolved: HashMap<String, ServiceInstance>,
}

impl RolloutWatcher {
    /// Watch every instance of `deploy`.
    pub fn new(deploy: Deploy, fleet: Arc<dyn FleetClient>, config: WatchConfig) -> Self {
        let unresolved = deploy
            .service_instances()
            .into_iter()
            .map(|instance| (instance.unit_name(), instance))
            .collect();
        Self {
            deploy,
            fleet,
            config,
            handlers: Vec::new(),
            unresolved,
        }
    }

    /// Append a handler. Handlers run in the order they were added.
    pub fn add_handler(&mut self, handler: impl CompletionHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn with_handler(mut self, handler: impl CompletionHandler + 'static) -> Self {
        self.add_handler(handler);
        self
    }

    pub fn deploy(&self) -> &Deploy {
        &self.deploy
    }

    /// Unit names not yet confirmed, sorted.
    pub fn unresolved(&self) -> Vec<String> {
        let mut names: Vec<String> = self.unresolved.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Fetch unit states once and classify every unresolved instance seen.
    ///
    /// A fleet error leaves the unresolved set untouched.
    pub async fn poll_once(&mut self) -> FleetResult<()> {
        debug!(
            service = %self.deploy.service_name,
            version = %self.deploy.version,
            unresolved = self.unresolved.len(),
            "checking unit states"
        );
        let states = self.fleet.unit_states().await?;

        for state in states {
            let Some(instance) = self.unresolved.get(&state.name) else {
                continue;
            };

            match state.classify() {
                SubState::Running => {
                    let event = Event::new(instance.clone(), state);
                    info!(unit = %event.state.name, "unit is running");
                    for handler in &self.handlers {
                        handler.handle(&event).await;
                    }
                    self.unresolved.remove(&event.state.name);
                }
                SubState::Failed => {
                    warn!(unit = %state.name, "unit failed to launch");
                    self.unresolved.remove(&state.name);
                }
                SubState::Pending => {
                    debug!(
                        unit = %state.name,
                        sub_state = %state.sub_state,
                        retry_in = ?self.config.delay,
                        "unit not yet resolved"
                    );
                }
            }
        }

        Ok(())
    }

    /// Poll until every instance resolves, the deadline passes, or
    /// `shutdown` flips to `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> WatchOutcome {
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        info!(
            service = %self.deploy.service_name,
            version = %self.deploy.version,
            instances = self.unresolved.len(),
            timeout = ?self.config.timeout,
            "rollout watcher started"
        );

        loop {
            if self.unresolved.is_empty() {
                info!(
                    service = %self.deploy.service_name,
                    version = %self.deploy.version,
                    "rollout resolved"
                );
                return WatchOutcome::Done;
            }
            if *shutdown.borrow() {
                return self.stopped();
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.delay) => {
                    if let Err(e) = self.poll_once().await {
                        warn!(
                            service = %self.deploy.service_name,
                            version = %self.deploy.version,
                            error = %e,
                            "failed to fetch unit states, retrying"
                        );
                    }
                }
                _ = &mut deadline => {
                    let unresolved = self.unresolved();
                    warn!(
                        service = %self.deploy.service_name,
                        version = %self.deploy.version,
                        timeout = ?self.config.timeout,
                        ?unresolved,
                        "timed out waiting for units to run"
                    );
                    return WatchOutcome::TimedOut(unresolved);
                }
                Ok(()) = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return self.stopped();
                    }
                }
            }
        }
    }

    /// Run the watcher on its own task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<WatchOutcome> {
        tokio::spawn(self.run(shutdown))
    }

    fn stopped(&self) -> WatchOutcome {
        let unresolved = self.unresolved();
        info!(
            service = %self.deploy.service_name,
            version = %self.deploy.version,
            ?unresolved,
            "rollout watcher stopped"
        );
        WatchOutcome::Stopped(unresolved)
    }
}
