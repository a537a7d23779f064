//! deckhand.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckhandConfig {
    pub server: ServerConfig,
    pub fleet: FleetConfig,
    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on.
    pub listen: String,
    /// HTTP basic auth username. Auth is disabled when unset.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// `unix:///path/to/fleet.sock` or `http://host:port`.
    pub endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/run/fleet.sock".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Registry prefix images are pulled from (`<prefix>/<service>:<version>`).
    pub image_prefix: String,
    /// Delay between unit state polls while confirming a rollout.
    pub poll_interval_ms: u64,
    /// Give up confirming a rollout after this long.
    pub watch_timeout_secs: u64,
    /// Unit file template to use instead of the built-in one.
    pub unit_template: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            image_prefix: String::new(),
            poll_interval_ms: 1000,
            watch_timeout_secs: 300,
            unit_template: None,
        }
    }
}

impl DeployConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn watch_timeout(&self) -> Duration {
        Duration::from_secs(self.watch_timeout_secs)
    }
}

impl FleetConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl DeckhandConfig {
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the watcher and fleet client cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.deploy.poll_interval_ms == 0 {
            return Err(CoreError::InvalidValue(
                "deploy.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> CoreResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Basic auth credentials, if both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.server.username, &self.server.password) {
            (Some(u), Some(p)) => Some((u.as_str(), p.as_str())),
            _ => None,
        }
    }
}
