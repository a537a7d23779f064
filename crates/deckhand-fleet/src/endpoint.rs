//! Fleet API endpoint addressing.

use std::fmt;
use std::path::PathBuf;

use crate::error::{FleetError, FleetResult};

/// Where the fleet API is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetEndpoint {
    /// Local fleet socket, e.g. `unix:///var/run/fleet.sock`.
    Unix(PathBuf),
    /// Remote fleet API, e.g. `http://10.0.0.5:49153`.
    Tcp(String),
}

impl FleetEndpoint {
    pub fn parse(s: &str) -> FleetResult<Self> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(FleetError::InvalidEndpoint(s.to_string()));
            }
            return Ok(FleetEndpoint::Unix(PathBuf::from(path)));
        }

        if let Some(authority) = s.strip_prefix("http://") {
            let authority = authority.trim_end_matches('/');
            if authority.is_empty() || authority.contains('/') {
                return Err(FleetError::InvalidEndpoint(s.to_string()));
            }
            return Ok(FleetEndpoint::Tcp(authority.to_string()));
        }

        Err(FleetError::InvalidEndpoint(s.to_string()))
    }

    /// Value for the `Host` header.
    pub fn host(&self) -> &str {
        match self {
            FleetEndpoint::Unix(_) => "fleet",
            FleetEndpoint::Tcp(authority) => authority,
        }
    }
}

impl fmt::Display for FleetEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FleetEndpoint::Unix(path) => write!(f, "unix://{}", path.display()),
            FleetEndpoint::Tcp(authority) => write!(f, "http://{authority}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unix_socket() {
        let endpoint = FleetEndpoint::parse("unix:///var/run/fleet.sock").unwrap();
        assert_eq!(endpoint, FleetEndpoint::Unix(PathBuf::from("/var/run/fleet.sock")));
        assert_eq!(endpoint.to_string(), "unix:///var/run/fleet.sock");
        assert_eq!(endpoint.host(), "fleet");
    }

    #[test]
    fn parses_tcp() {
        let endpoint = FleetEndpoint::parse("http://10.0.0.5:49153/").unwrap();
        assert_eq!(endpoint, FleetEndpoint::Tcp("10.0.0.5:49153".to_string()));
        assert_eq!(endpoint.host(), "10.0.0.5:49153");
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(FleetEndpoint::parse("https://fleet:443").is_err());
        assert!(FleetEndpoint::parse("unix://").is_err());
        assert!(FleetEndpoint::parse("http://fleet/v1").is_err());
        assert!(FleetEndpoint::parse("fleet.sock").is_err());
    }
}
