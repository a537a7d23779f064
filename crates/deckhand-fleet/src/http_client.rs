//! HTTP implementation of [`FleetClient`] against the fleet v1 API.
//!
//! Each call opens its own HTTP/1 connection to the endpoint, so the
//! client holds no connection state and is freely shared across tasks.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1::SendRequest;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use deckhand_core::config::FleetConfig;
use deckhand_core::{TARGET_INACTIVE, Unit, UnitOption, UnitState};

use crate::client::FleetClient;
use crate::endpoint::FleetEndpoint;
use crate::error::{FleetError, FleetResult};

const API_PREFIX: &str = "/fleet/v1";

/// Fleet API client over a unix socket or TCP.
#[derive(Debug, Clone)]
pub struct HttpFleetClient {
    endpoint: FleetEndpoint,
    timeout: Duration,
}

#[derive(Default, Deserialize)]
struct UnitPage {
    #[serde(default)]
    units: Vec<Unit>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Default, Deserialize)]
struct StatePage {
    #[serde(default)]
    states: Vec<UnitState>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Serialize)]
struct UnitBody<'a> {
    #[serde(rename = "desiredState")]
    desired_state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<&'a [UnitOption]>,
}

impl HttpFleetClient {
    pub fn new(endpoint: FleetEndpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Build a client from the `[fleet]` section of `deckhand.toml`.
    pub fn from_config(config: &FleetConfig) -> FleetResult<Self> {
        let endpoint = FleetEndpoint::parse(&config.endpoint)?;
        Ok(Self::new(endpoint, config.request_timeout()))
    }

    pub fn endpoint(&self) -> &FleetEndpoint {
        &self.endpoint
    }

    /// Open a connection to the endpoint.
    async fn connect(&self) -> FleetResult<SendRequest<Full<Bytes>>> {
        let connect_err = |source| FleetError::Connect {
            endpoint: self.endpoint.to_string(),
            source,
        };

        match &self.endpoint {
            FleetEndpoint::Tcp(authority) => {
                let stream = tokio::net::TcpStream::connect(authority.as_str())
                    .await
                    .map_err(connect_err)?;
                handshake(stream).await
            }
            #[cfg(unix)]
            FleetEndpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path)
                    .await
                    .map_err(connect_err)?;
                handshake(stream).await
            }
            #[cfg(not(unix))]
            FleetEndpoint::Unix(_) => Err(FleetError::InvalidEndpoint(self.endpoint.to_string())),
        }
    }

    /// Send one request and return the status and full body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> FleetResult<(StatusCode, Bytes)> {
        let exchange = async {
            let mut sender = self.connect().await?;

            let req = Request::builder()
                .method(method.clone())
                .uri(path)
                .header(HOST, self.endpoint.host())
                .header(USER_AGENT, concat!("deckhand/", env!("CARGO_PKG_VERSION")))
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(body.unwrap_or_default())))?;

            let resp = sender.send_request(req).await?;
            let status = resp.status();
            let body = resp.into_body().collect().await?.to_bytes();
            Ok::<_, FleetError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| FleetError::Timeout(self.timeout))??;

        debug!(%method, %path, status = status.as_u16(), "fleet request");

        if !status.is_success() {
            return Err(FleetError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        Ok((status, body))
    }

    async fn put_unit(&self, name: &str, body: &UnitBody<'_>) -> FleetResult<()> {
        let path = format!("{API_PREFIX}/units/{name}");
        self.request(Method::PUT, &path, Some(serde_json::to_vec(body)?))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FleetClient for HttpFleetClient {
    async fn units(&self) -> FleetResult<Vec<Unit>> {
        let mut units = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let path = page_path("units", token.as_deref());
            let (_, body) = self.request(Method::GET, &path, None).await?;
            let page: UnitPage = decode_page(&body)?;
            units.extend(page.units);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => return Ok(units),
            }
        }
    }

    async fn create_unit(&self, unit: &Unit) -> FleetResult<()> {
        let desired_state = if unit.desired_state.is_empty() {
            TARGET_INACTIVE
        } else {
            unit.desired_state.as_str()
        };
        self.put_unit(
            &unit.name,
            &UnitBody {
                desired_state,
                options: Some(&unit.options),
            },
        )
        .await
    }

    async fn destroy_unit(&self, name: &str) -> FleetResult<()> {
        let path = format!("{API_PREFIX}/units/{name}");
        self.request(Method::DELETE, &path, None).await?;
        Ok(())
    }

    async fn unit_states(&self) -> FleetResult<Vec<UnitState>> {
        let mut states = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let path = page_path("state", token.as_deref());
            let (_, body) = self.request(Method::GET, &path, None).await?;
            let page: StatePage = decode_page(&body)?;
            states.extend(page.states);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => return Ok(states),
            }
        }
    }

    async fn set_unit_target_state(&self, name: &str, state: &str) -> FleetResult<()> {
        self.put_unit(
            name,
            &UnitBody {
                desired_state: state,
                options: None,
            },
        )
        .await
    }
}

async fn handshake<S>(stream: S) -> FleetResult<SendRequest<Full<Bytes>>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = hyper_util::rt::TokioIo::new(stream);
    let (sender, conn) = hyper::client::conn::http1::handshake(io).await?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "fleet connection closed with error");
        }
    });

    Ok(sender)
}

fn page_path(collection: &str, token: Option<&str>) -> String {
    match token {
        Some(token) => format!("{API_PREFIX}/{collection}?nextPageToken={token}"),
        None => format!("{API_PREFIX}/{collection}"),
    }
}

/// Fleet answers an empty collection with an empty body or `{}`.
fn decode_page<T: serde::de::DeserializeOwned + Default>(body: &[u8]) -> FleetResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(body)?)
}
