#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use epicflow_core::api::{
    AgentRuntime, EpicScheduler, ExecutionSettings, ProviderChild, ProviderEpic,
    SchedulerOptions, SpawnedAgent, TaskProvider,
};
use tokio::sync::{Notify, Semaphore};

pub fn child(id: &str, priority: i64, blocked_by: &[&str]) -> ProviderChild {
    ProviderChild {
        id: id.to_string(),
        title: format!("Task {id}"),
        priority,
        status: "open".to_string(),
        assignee: None,
        blocked_by: blocked_by.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn settings(max_concurrent: usize, auto_spawn: bool) -> ExecutionSettings {
    ExecutionSettings {
        max_concurrent,
        auto_spawn,
        ..ExecutionSettings::default()
    }
}

pub struct FakeProvider {
    epic: Option<ProviderEpic>,
}

impl FakeProvider {
    pub fn with_children(children: Vec<ProviderChild>) -> Self {
        Self {
            epic: Some(ProviderEpic {
                epic_title: "Fake epic".to_string(),
                children,
            }),
        }
    }

    pub fn failing() -> Self {
        Self { epic: None }
    }
}

#[async_trait]
impl TaskProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_children(&self, epic_id: &str) -> anyhow::Result<ProviderEpic> {
        self.epic
            .clone()
            .ok_or_else(|| anyhow::anyhow!("provider unavailable for {epic_id}"))
    }
}

/// Agent runtime that records calls, fails on demand and can hold spawns
/// until the test releases them.
#[derive(Default)]
pub struct FakeRuntime {
    calls: Mutex<Vec<String>>,
    fail: HashSet<String>,
    hold: Option<Arc<Semaphore>>,
    pub entered: Arc<Notify>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            fail: ids.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Every spawn waits for a permit on the returned semaphore.
    pub fn held() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                hold: Some(gate.clone()),
                ..Self::default()
            },
            gate,
        )
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn agent_for(task_id: &str) -> String {
    format!("agent-{task_id}")
}

#[async_trait]
impl AgentRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    async fn spawn(&self, task_id: &str) -> anyhow::Result<SpawnedAgent> {
        self.calls.lock().unwrap().push(task_id.to_string());
        self.entered.notify_one();

        if let Some(gate) = &self.hold {
            gate.acquire().await?.forget();
        }
        if self.fail.contains(task_id) {
            anyhow::bail!("runtime refused {task_id}");
        }
        Ok(SpawnedAgent {
            session_id: format!("session-{task_id}"),
            agent_id: agent_for(task_id),
        })
    }
}

pub fn scheduler(provider: FakeProvider, runtime: Arc<FakeRuntime>) -> EpicScheduler {
    scheduler_with_stagger(provider, runtime, Duration::ZERO)
}

pub fn scheduler_with_stagger(
    provider: FakeProvider,
    runtime: Arc<FakeRuntime>,
    stagger: Duration,
) -> EpicScheduler {
    EpicScheduler::new(
        Arc::new(provider),
        runtime,
        SchedulerOptions {
            stagger,
            ..SchedulerOptions::default()
        },
    )
}
