//! Start, stop and health of a running agent

use std::{sync::atomic::Ordering, time::Duration};

use aiops_agent::{
    agent::{Agent, AgentHandle, HealthStatus},
    alerts::AlertManager,
};
use tokio::task::JoinHandle;

use crate::helpers::*;

async fn wait_until_running(handle: &AgentHandle) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("agent never reported running");
}

fn spawn_agent(mut agent: Agent) -> JoinHandle<Agent> {
    tokio::spawn(async move {
        agent.start().await.unwrap();
        agent
    })
}

fn create_agent(interval: u64) -> Agent {
    let mut config = create_test_config(None);
    config.collection_interval = interval;
    let sink = AlertManager::new(&config).unwrap();
    let source = ScriptedSource::repeating(create_snapshot(10.0, 10.0, 10.0));
    Agent::with_components(config, Box::new(source), Box::new(sink))
}

#[tokio::test]
async fn test_health_reflects_lifecycle() {
    let agent = create_agent(60);
    let handle = agent.handle();

    let report = handle.health_check();
    assert_eq!(report.status, HealthStatus::Stopped);
    assert_eq!(report.agent_name, "integration-agent");
    assert!(report.uptime_seconds >= 0.0);

    let task = spawn_agent(agent);
    wait_until_running(&handle).await;
    assert_eq!(handle.health_check().status, HealthStatus::Healthy);

    handle.stop();
    let agent = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("stop did not interrupt the interval wait")
        .unwrap();

    assert!(!agent.is_running());
    assert_eq!(agent.health_check().status, HealthStatus::Stopped);
}

#[tokio::test]
async fn test_agent_can_be_restarted() {
    let agent = create_agent(60);
    let handle = agent.handle();

    let task = spawn_agent(agent);
    wait_until_running(&handle).await;
    handle.stop();
    let agent = task.await.unwrap();

    let task = spawn_agent(agent);
    wait_until_running(&handle).await;
    handle.stop();
    task.await.unwrap();
}

#[tokio::test]
async fn test_stop_before_start_has_no_effect() {
    let agent = create_agent(60);
    let handle = agent.handle();

    handle.stop();
    assert_eq!(handle.health_check().status, HealthStatus::Stopped);

    let task = spawn_agent(agent);
    wait_until_running(&handle).await;
    handle.stop();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_cycles_repeat_on_interval() {
    let config = create_test_config(None);
    let sink = AlertManager::new(&config).unwrap();
    let source = ScriptedSource::repeating(create_snapshot(10.0, 10.0, 10.0));
    let calls = source.calls();
    let agent = Agent::with_components(config, Box::new(source), Box::new(sink));
    let handle = agent.handle();

    let task = spawn_agent(agent);
    while calls.load(Ordering::SeqCst) < 3 {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    handle.stop();
    task.await.unwrap();

    assert!(calls.load(Ordering::SeqCst) >= 3);
}
