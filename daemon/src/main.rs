//! Agora daemon: entry point for running a voting node.

use agora_node::{init_logging, AgoraNode, NodeConfig};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agora-daemon", about = "Real-time condominium voting server")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings are
    /// used as the base; CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Interface to bind the HTTP API to.
    #[arg(long, env = "AGORA_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// HTTP API port.
    #[arg(long, env = "AGORA_PORT")]
    port: Option<u16>,

    /// HMAC secret for voting tokens.
    #[arg(long, env = "AGORA_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,

    /// Bearer key for the admin endpoints.
    #[arg(long, env = "AGORA_ADMIN_API_KEY", hide_env_values = true)]
    admin_api_key: Option<String>,

    /// Base URL of the resident frontend, used in generated voting links.
    #[arg(long, env = "AGORA_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// JSON file to seed the ledger from.
    #[arg(long, env = "AGORA_SEED_FILE")]
    seed_file: Option<PathBuf>,

    /// Seconds between stream heartbeats.
    #[arg(long, env = "AGORA_HEARTBEAT_SECS")]
    heartbeat_secs: Option<u64>,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "AGORA_ENABLE_METRICS")]
    metrics: bool,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Clone, Copy, Debug)]
enum Command {
    /// Run the voting server.
    Run,
    /// Print the effective configuration as TOML, secrets masked.
    PrintConfig,
}

impl Cli {
    /// Lay CLI flags and env vars over `base`.
    fn overlay(self, base: NodeConfig) -> NodeConfig {
        NodeConfig {
            bind_address: self.bind_address.unwrap_or(base.bind_address),
            port: self.port.unwrap_or(base.port),
            token_secret: self.token_secret.unwrap_or(base.token_secret),
            admin_api_key: self.admin_api_key.unwrap_or(base.admin_api_key),
            public_base_url: self.public_base_url.unwrap_or(base.public_base_url),
            seed_file: self.seed_file.or(base.seed_file),
            heartbeat_secs: self.heartbeat_secs.unwrap_or(base.heartbeat_secs),
            enable_metrics: self.metrics || base.enable_metrics,
            log_format: self.log_format.unwrap_or(base.log_format),
            log_level: self.log_level.unwrap_or(base.log_level),
            ..base
        }
    }
}

fn load_config(cli: Cli) -> anyhow::Result<NodeConfig> {
    let base = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    Ok(cli.overlay(base))
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command;
    let config = load_config(cli)?;

    match command {
        Command::PrintConfig => {
            let shown = NodeConfig {
                token_secret: mask(&config.token_secret),
                admin_api_key: mask(&config.admin_api_key),
                ..config
            };
            println!("{}", shown.to_toml_string()?);
        }
        Command::Run => {
            init_logging(config.log_format()?, &config.log_level)?;

            let mut node = AgoraNode::new(config).context("building node")?;
            let addr = node.start().await?;
            tracing::info!(%addr, "Agora daemon running");

            node.shutdown.wait_for_signal().await;
            tracing::info!("shutdown signal received, stopping node");
            node.stop().await?;

            tracing::info!("Agora daemon exited cleanly");
        }
    }

    Ok(())
}
