//! `deckhandd serve` — assemble the daemon and run until Ctrl-C.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use deckhand_api::{ApiState, Credentials};
use deckhand_core::{DeckhandConfig, UnitTemplate};
use deckhand_fleet::HttpFleetClient;
use deckhand_rollout::{Orchestrator, WatchConfig};

pub(crate) async fn run(config: DeckhandConfig) -> anyhow::Result<()> {
    info!("Deckhand daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let fleet = Arc::new(HttpFleetClient::from_config(&config.fleet)?);
    info!(endpoint = %fleet.endpoint(), "fleet client configured");

    let template = match &config.deploy.unit_template {
        Some(path) => UnitTemplate::from_file(path)?,
        None => UnitTemplate::default(),
    };
    info!(template = template.name(), "unit template loaded");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let watch_config = WatchConfig::from(&config.deploy);
    let orchestrator = Orchestrator::new(fleet)
        .with_template(template)
        .with_image_prefix(config.deploy.image_prefix.clone())
        .with_watch_config(watch_config)
        .with_shutdown(shutdown_rx);
    info!(
        poll_interval = ?watch_config.delay,
        watch_timeout = ?watch_config.timeout,
        "orchestrator initialized"
    );

    let credentials = config
        .credentials()
        .map(|(user, pass)| Credentials::new(user, pass));
    if credentials.is_none() {
        info!("no credentials configured, API is unauthenticated");
    }

    // ── Start API server ───────────────────────────────────────

    let state = ApiState::new(Arc::new(orchestrator)).with_credentials(credentials);
    let router = deckhand_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.listen.as_str()).await?;
    info!(addr = %listener.local_addr()?, "API server starting");

    // Graceful shutdown on Ctrl-C. Flipping the channel stops every
    // in-flight rollout watcher, leaving previous versions running.
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    info!("Deckhand daemon stopped");
    Ok(())
}
