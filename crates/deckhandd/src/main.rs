//! deckhandd — the Deckhand daemon.
//!
//! Serves the deploy API in front of a fleet cluster:
//! - fleet client (unix socket or HTTP)
//! - unit template
//! - deploy orchestrator and rollout watchers
//! - REST API with basic auth
//!
//! # Usage
//!
//! ```text
//! deckhandd serve --config /etc/deckhand.toml --listen 0.0.0.0:3000
//! deckhandd config > deckhand.toml
//! ```

mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use deckhand_core::DeckhandConfig;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,deckhandd=debug,deckhand=debug";

#[derive(Parser)]
#[command(name = "deckhandd", about = "Deckhand rollout daemon", version)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the deploy API.
    Serve(ServeArgs),
    /// Print the effective configuration as TOML.
    Config {
        /// Configuration file to load before printing.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Flags override values from the configuration file.
#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Path to deckhand.toml.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:3000.
    #[arg(long)]
    pub listen: Option<String>,

    /// Fleet API endpoint: unix:///var/run/fleet.sock or http://host:port.
    #[arg(long)]
    pub fleet_endpoint: Option<String>,

    /// Registry prefix for images.
    #[arg(long)]
    pub image_prefix: Option<String>,

    /// Basic auth username.
    #[arg(long, env = "DECKHAND_USERNAME")]
    pub username: Option<String>,

    /// Basic auth password.
    #[arg(long, env = "DECKHAND_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl ServeArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut DeckhandConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen = listen.clone();
        }
        if let Some(endpoint) = &self.fleet_endpoint {
            config.fleet.endpoint = endpoint.clone();
        }
        if let Some(prefix) = &self.image_prefix {
            config.deploy.image_prefix = prefix.clone();
        }
        if let Some(username) = &self.username {
            config.server.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.server.password = Some(password.clone());
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DeckhandConfig> {
    Ok(match path {
        Some(path) => DeckhandConfig::from_file(path)?,
        None => DeckhandConfig::default(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if cli.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Command::Serve(args) => {
            let mut config = load_config(args.config.as_ref())?;
            args.apply(&mut config);
            serve::run(config).await
        }
        Command::Config { config } => {
            print!("{}", load_config(config.as_ref())?.to_toml_string()?);
            Ok(())
        }
    }
}
