//! Optional HTTP endpoint exposing the agent's health and latest metrics

use rocket::{Build, Rocket, State, figment::Figment, get, routes, serde::json::Json};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

use crate::{
    agent::{AgentHandle, HealthReport},
    config::AgentConfig,
    export::{ExportRecord, SnapshotCache},
};

#[get("/health")]
#[instrument(skip_all)]
fn health(agent: &State<AgentHandle>) -> Json<HealthReport> {
    Json(agent.health_check())
}

#[get("/ping")]
fn ping() {}

/// Latest exported snapshot, 404 until the first export.
#[get("/metrics")]
fn metrics(cache: &State<SnapshotCache>) -> Option<Json<ExportRecord>> {
    cache.latest().map(Json)
}

fn get_config(config: &AgentConfig) -> Figment {
    rocket::Config::figment()
        .merge(("port", config.health_port))
        .merge(("address", config.health_address))
        .merge(("workers", 1))
        .merge(("log_level", "off"))
        .merge(("shutdown.ctrlc", false))
}

pub fn build(config: &AgentConfig, agent: AgentHandle, cache: SnapshotCache) -> Rocket<Build> {
    rocket::custom(get_config(config))
        .manage(agent)
        .manage(cache)
        .mount("/", routes![health, ping, metrics])
}

/// Launches the server in the background. It lives until the process exits.
pub fn spawn(config: &AgentConfig, agent: AgentHandle, cache: SnapshotCache) -> JoinHandle<()> {
    let rocket = build(config, agent, cache);
    info!(
        "health server listening on {}:{}",
        config.health_address, config.health_port
    );

    tokio::spawn(async move {
        if let Err(e) = rocket.launch().await {
            error!("health server failed: {e}");
        }
    })
}
