use std::path::PathBuf;

use aiops_agent::{
    agent::{Agent, VERSION},
    config::AgentConfig,
    export::SnapshotCache,
    logging, server,
};
use anyhow::Context;
use clap::Parser;
use tracing::{info, trace, warn};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Host monitoring agent with threshold alerting")]
struct Args {
    /// YAML or JSON config file, applied over the environment
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = AgentConfig::load(args.config.as_deref()).context("invalid configuration")?;
    logging::init(&config)?;
    trace!("started with args: {args:?}");

    banner(&config);

    let mut agent = Agent::new(config.clone()).context("failed to initialize agent")?;
    let handle = agent.handle();

    if config.health_server_enabled {
        let cache = SnapshotCache::new();
        agent.add_exporter(cache.clone());
        server::spawn(&config, handle.clone(), cache);
    }

    tokio::select! {
        result = agent.start() => result?,
        _ = shutdown_signal() => {
            info!("received shutdown signal");
            handle.stop();
        }
    }

    info!("agent shutdown complete");
    Ok(())
}

fn banner(config: &AgentConfig) {
    info!("{}", "=".repeat(60));
    info!("AIOps monitoring agent v{VERSION}");
    info!("{}", "=".repeat(60));
    info!(
        "agent: {} ({}), interval: {}s",
        config.agent_name, config.environment, config.collection_interval
    );
    match serde_json::to_string(config) {
        Ok(json) => info!("configuration: {json}"),
        Err(e) => warn!("could not serialize configuration: {e}"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
