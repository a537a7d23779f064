//! deckhand-api — REST API for Deckhand.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/v1/version` | Daemon version |
//! | POST | `/v1/services/{name}/deploys` | Deploy a new version |
//! | DELETE | `/v1/services/{name}/deploys/{version}` | Destroy a version (`?timestamp=` narrows) |
//! | GET | `/v1/services/{name}/units` | List a service's units |
//!
//! Every route requires HTTP basic auth when credentials are configured.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use deckhand_rollout::Orchestrator;

pub use auth::Credentials;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    /// Reported by `GET /v1/version`.
    pub version: String,
    /// Basic auth credentials; `None` leaves the API open.
    pub credentials: Option<Credentials>,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            version: env!("CARGO_PKG_VERSION").to_string(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let v1 = Router::new()
        .route("/version", get(handlers::version))
        .route("/services/{name}/deploys", post(handlers::create_deploy))
        .route("/services/{name}/deploys/{version}", delete(handlers::destroy_deploy))
        .route("/services/{name}/units", get(handlers::list_units))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_basic_auth))
        .with_state(state);

    Router::new().nest("/v1", v1)
}
