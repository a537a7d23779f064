//! Rollout regression tests.
//!
//! Runs the full stack the daemon assembles: the API router, the
//! orchestrator, and `HttpFleetClient` talking HTTP to a fake fleet served
//! on a local port.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceExt;

use deckhand_api::{ApiState, Credentials, build_router};
use deckhand_fleet::{FleetEndpoint, HttpFleetClient};
use deckhand_rollout::{Orchestrator, WatchConfig};

/// Units and sub-states of the fake fleet, keyed by unit name.
#[derive(Default)]
struct FleetState {
    units: BTreeMap<String, Value>,
    sub_states: BTreeMap<String, String>,
    destroyed: Vec<String>,
}

type SharedFleet = Arc<Mutex<FleetState>>;

async fn list_units(State(fleet): State<SharedFleet>) -> Json<Value> {
    let fleet = fleet.lock().unwrap();
    Json(json!({ "units": fleet.units.values().collect::<Vec<_>>() }))
}

async fn list_states(State(fleet): State<SharedFleet>) -> Json<Value> {
    let fleet = fleet.lock().unwrap();
    let states: Vec<Value> = fleet
        .sub_states
        .iter()
        .map(|(name, sub)| json!({ "name": name, "systemdSubState": sub }))
        .collect();
    Json(json!({ "states": states }))
}

async fn put_unit(
    State(fleet): State<SharedFleet>,
    Path(name): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut fleet = fleet.lock().unwrap();
    let desired = body["desiredState"].clone();
    let unit = fleet
        .units
        .entry(name.clone())
        .or_insert_with(|| json!({ "name": name, "options": [] }));
    if let Some(options) = body.get("options") {
        unit["options"] = options.clone();
    }
    unit["desiredState"] = desired.clone();
    unit["currentState"] = desired;
    StatusCode::NO_CONTENT
}

async fn delete_unit(State(fleet): State<SharedFleet>, Path(name): Path<String>) -> StatusCode {
    let mut fleet = fleet.lock().unwrap();
    fleet.sub_states.remove(&name);
    match fleet.units.remove(&name) {
        Some(_) => {
            fleet.destroyed.push(name);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

/// Serve a fake fleet API and return the daemon router pointed at it.
async fn start(seed: &[&str], credentials: Option<Credentials>) -> (Router, SharedFleet) {
    let fleet: SharedFleet = Arc::new(Mutex::new(FleetState::default()));
    {
        let mut state = fleet.lock().unwrap();
        for name in seed {
            state.units.insert(
                name.to_string(),
                json!({
                    "name": name,
                    "options": [],
                    "currentState": "launched",
                    "desiredState": "launched",
                    "machineID": "m1",
                }),
            );
            state.sub_states.insert(name.to_string(), "running".to_string());
        }
    }

    let fake = Router::new()
        .route("/fleet/v1/units", get(list_units))
        .route(
            "/fleet/v1/units/{name}",
            axum::routing::put(put_unit).delete(delete_unit),
        )
        .route("/fleet/v1/state", get(list_states))
        .with_state(fleet.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, fake).await.unwrap();
    });

    let client = HttpFleetClient::new(FleetEndpoint::Tcp(addr.to_string()), Duration::from_secs(5));
    let orchestrator = Orchestrator::new(Arc::new(client))
        .with_image_prefix("registry.example.com")
        .with_watch_config(WatchConfig {
            delay: Duration::from_millis(10),
            timeout: Duration::from_secs(10),
        });
    let router = build_router(ApiState::new(Arc::new(orchestrator)).with_credentials(credentials));
    (router, fleet)
}

fn create(service: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/v1/services/{service}/deploys"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_until(fleet: &SharedFleet, done: impl Fn(&FleetState) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done(&fleet.lock().unwrap()) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn deploy_replaces_previous_version_once_running() {
    let (router, fleet) = start(&["app:v1:t0@1.service"], None).await;

    let resp = router
        .clone()
        .oneshot(create(
            "app",
            json!({"deploy": {"version": "v2", "timestamp": "t1", "destroy_previous": true}}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    {
        let state = fleet.lock().unwrap();
        let unit = &state.units["app:v2:t1@1.service"];
        assert_eq!(unit["desiredState"], "launched");
        assert!(
            unit["options"]
                .as_array()
                .unwrap()
                .iter()
                .any(|o| o["value"] == "/usr/bin/docker pull registry.example.com/app:v2")
        );
        assert!(state.destroyed.is_empty());
    }

    fleet
        .lock()
        .unwrap()
        .sub_states
        .insert("app:v2:t1@1.service".to_string(), "running".to_string());

    wait_until(&fleet, |s| !s.destroyed.is_empty()).await;
    let state = fleet.lock().unwrap();
    assert_eq!(state.destroyed, vec!["app:v1:t0@1.service"]);
    assert_eq!(state.units.keys().collect::<Vec<_>>(), vec!["app:v2:t1@1.service"]);
}

#[tokio::test]
async fn deploy_preserves_scale_of_running_version() {
    let (router, fleet) = start(
        &["web:v1:t0@1.service", "web:v1:t0@2.service", "web:v1:t0@3.service"],
        None,
    )
    .await;

    let resp = router
        .oneshot(create("web", json!({"deploy": {"version": "v2", "timestamp": "t1"}})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let state = fleet.lock().unwrap();
    let new_units: Vec<&String> = state.units.keys().filter(|n| n.contains(":v2:")).collect();
    assert_eq!(new_units.len(), 3);
}

#[tokio::test]
async fn units_listing_goes_through_fleet() {
    let (router, _fleet) = start(&["app:v1:t0@1.service", "vulcand.service"], None).await;

    let req = Request::builder()
        .uri("/v1/services/app/units")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = http_body_util::BodyExt::collect(resp.into_body())
        .await
        .unwrap()
        .to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["units"][0]["machine_id"], "m1");
    assert_eq!(body["units"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn destroy_removes_units_from_fleet() {
    let (router, fleet) = start(&["app:v1:t0@1.service", "app:v1:t0@2.service"], None).await;

    let req = Request::builder()
        .method("DELETE")
        .uri("/v1/services/app/deploys/v1")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(fleet.lock().unwrap().units.is_empty());
}

#[tokio::test]
async fn unauthenticated_deploy_is_rejected() {
    let (router, fleet) = start(&[], Some(Credentials::new("deploy", "s3cret"))).await;

    let resp = router
        .oneshot(create("app", json!({"deploy": {"version": "v1"}})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(fleet.lock().unwrap().units.is_empty());
}
