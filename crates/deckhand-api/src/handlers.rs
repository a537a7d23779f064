//! REST API handlers.
//!
//! Each handler delegates to the [`Orchestrator`](deckhand_rollout::Orchestrator),
//! which reads fleet fresh on every call.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use deckhand_core::{Deploy, VersionedUnit};
use deckhand_rollout::RolloutError;

use crate::ApiState;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            success: false,
            error: msg.to_string(),
        }),
    )
}

fn rollout_error(e: &RolloutError) -> axum::response::Response {
    if e.is_validation() {
        warn!(error = %e, "rejected deploy request");
        error_response(&e.to_string(), StatusCode::BAD_REQUEST).into_response()
    } else {
        error!(error = %e, "deploy request failed");
        error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
    }
}

// ── Version ────────────────────────────────────────────────────

#[derive(Serialize)]
struct VersionBody<'a> {
    version: &'a str,
}

/// GET /v1/version
pub async fn version(State(state): State<ApiState>) -> impl IntoResponse {
    Json(VersionBody {
        version: &state.version,
    })
    .into_response()
}

// ── Deploys ────────────────────────────────────────────────────

/// Body of a create request: `{"deploy": {...}}`.
#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub deploy: Deploy,
}

/// POST /v1/services/{name}/deploys
///
/// Answers once every unit is created and launched. Retiring the previous
/// version continues in the background.
pub async fn create_deploy(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Result<Json<DeployRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(&rejection.body_text(), StatusCode::BAD_REQUEST).into_response();
        }
    };

    match state.orchestrator.create(&name, req.deploy).await {
        Ok(created) => {
            info!(
                service = %name,
                version = %created.deploy.version,
                units = created.units.len(),
                watching = created.watcher.is_some(),
                "deploy started"
            );
            StatusCode::CREATED.into_response()
        }
        Err(e) => rollout_error(&e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DestroyParams {
    pub timestamp: Option<String>,
}

/// DELETE /v1/services/{name}/deploys/{version}
pub async fn destroy_deploy(
    State(state): State<ApiState>,
    Path((name, version)): Path<(String, String)>,
    Query(params): Query<DestroyParams>,
) -> impl IntoResponse {
    match state
        .orchestrator
        .destroy(&name, &version, params.timestamp.as_deref())
        .await
    {
        Ok(destroyed) => {
            info!(service = %name, %version, units = destroyed.len(), "deploy destroyed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => rollout_error(&e),
    }
}

// ── Units ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct UnitsBody {
    units: Vec<VersionedUnit>,
}

/// GET /v1/services/{name}/units
pub async fn list_units(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.units(&name).await {
        Ok(units) => Json(UnitsBody { units }).into_response(),
        Err(e) => rollout_error(&e),
    }
}
