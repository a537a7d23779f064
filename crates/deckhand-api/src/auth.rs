//! HTTP basic authentication.

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use crate::ApiState;
use crate::handlers::error_response;

const REALM: &str = "Basic realm=\"Deckhand\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Whether `headers` carry these credentials.
    pub fn authorize(&self, headers: &HeaderMap) -> bool {
        basic_credentials(headers)
            .is_some_and(|(user, pass)| user == self.username && pass == self.password)
    }
}

/// Decode `Authorization: Basic <base64(user:pass)>`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Reject requests without valid credentials, when any are configured.
pub async fn require_basic_auth(
    State(state): State<ApiState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(credentials) = &state.credentials else {
        return next.run(req).await;
    };

    if credentials.authorize(req.headers()) {
        return next.run(req).await;
    }

    warn!(method = %req.method(), path = %req.uri().path(), "rejected unauthenticated request");
    let mut resp = error_response("unauthorized", StatusCode::UNAUTHORIZED).into_response();
    resp.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn accepts_matching_credentials() {
        let creds = Credentials::new("user", "pass");
        // base64("user:pass")
        assert!(creds.authorize(&headers("Basic dXNlcjpwYXNz")));
        assert!(creds.authorize(&headers("basic dXNlcjpwYXNz")));
    }

    #[test]
    fn rejects_wrong_or_malformed_credentials() {
        let creds = Credentials::new("user", "other");
        assert!(!creds.authorize(&headers("Basic dXNlcjpwYXNz")));
        assert!(!creds.authorize(&headers("Bearer dXNlcjpwYXNz")));
        assert!(!creds.authorize(&headers("Basic !!!")));
        assert!(!creds.authorize(&HeaderMap::new()));
    }

    #[test]
    fn password_may_contain_colons() {
        let creds = Credentials::new("user", "a:b");
        let encoded = STANDARD.encode("user:a:b");
        assert!(creds.authorize(&headers(&format!("Basic {encoded}"))));
    }
}
