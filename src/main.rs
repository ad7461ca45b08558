//! hyperion-poller daemon: follows one account and logs its new actions.
//!
//! Reads `~/.hyperion-poller/config.yaml` (or `--config`), discovers
//! endpoints from the registry, then polls until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use hyperion_poller::api::hyperion::HyperionClient;
use hyperion_poller::discovery::EndpointDirectory;
use hyperion_poller::poller::events;
use hyperion_poller::{PollEvent, PollLoop, PollerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the YAML config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the tracked account.
    #[arg(long)]
    account: Option<String>,
    /// Override the first block to query.
    #[arg(long)]
    start_block: Option<u64>,
    /// Emit logs as JSON.
    #[arg(long)]
    json: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hyperion_poller=info".into());
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn load_config(args: &Args) -> Result<PollerConfig> {
    let path = match &args.config {
        Some(p) => p.clone(),
        None => PollerConfig::default_path().context("Cannot determine home directory")?,
    };
    let mut config = PollerConfig::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(account) = &args.account {
        config.account = account.clone();
    }
    if let Some(start_block) = args.start_block {
        config.start_block = start_block;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Log each delivered action as `block timestamp name`.
async fn log_events(mut rx: mpsc::Receiver<PollEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            PollEvent::Actions(actions) => {
                for action in &actions {
                    info!(
                        "{} {} {}",
                        action.block_num,
                        action.timestamp,
                        action.name().unwrap_or("?")
                    );
                }
            }
            PollEvent::SuccessfulQuery => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    info!("📡 hyperion-poller v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;
    info!(
        account = %config.account,
        start_block = config.start_block,
        endpoints = config.endpoints.len(),
        fetch_endpoint_list = config.fetch_endpoint_list,
        "Configuration loaded"
    );

    let client = HyperionClient::new(config.request_timeout())
        .context("Failed to build HTTP client")?;
    let directory = EndpointDirectory::new(client.inner().clone(), config.registry_url.clone());

    let (tx, rx) = events::channel(256);
    let mut poll_loop = PollLoop::new(&config, Arc::new(client), tx);
    if config.fetch_endpoint_list {
        if let Some(chain_id) = &config.chain_id {
            poll_loop = poll_loop.with_directory(directory, chain_id.clone());
        }
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    let consumer = tokio::spawn(log_events(rx));
    let poller = tokio::spawn(poll_loop.run(stop_rx));

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
    let _ = stop_tx.send(true);

    let state = poller.await.context("Poll loop panicked")?;
    consumer.await.context("Consumer panicked")?;
    info!(
        next_block = state.cursor.next_block(),
        last_sequence = state.cursor.last_sequence(),
        "Stopped"
    );
    Ok(())
}
