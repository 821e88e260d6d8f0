use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use epicflow_core::api::{
    AgentRuntime, EpicScheduler, ProviderChild, ProviderEpic, SchedulerOptions, SpawnedAgent,
    TaskProvider,
};

pub struct FixedProvider {
    epic: Option<ProviderEpic>,
}

impl FixedProvider {
    /// a <- b <- c, all open.
    pub fn chain() -> Self {
        let child = |id: &str, blocked_by: &[&str]| ProviderChild {
            id: id.to_string(),
            title: id.to_uppercase(),
            priority: 1,
            status: "open".to_string(),
            assignee: None,
            blocked_by: blocked_by.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            epic: Some(ProviderEpic {
                epic_title: "Chain".to_string(),
                children: vec![child("a", &[]), child("b", &["a"]), child("c", &["b"])],
            }),
        }
    }

    pub fn unavailable() -> Self {
        Self { epic: None }
    }
}

#[async_trait]
impl TaskProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch_children(&self, epic_id: &str) -> anyhow::Result<ProviderEpic> {
        self.epic
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no such epic: {epic_id}"))
    }
}

#[derive(Default)]
pub struct RecordingRuntime {
    calls: Mutex<Vec<String>>,
}

impl RecordingRuntime {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRuntime for RecordingRuntime {
    fn name(&self) -> &str {
        "recording"
    }

    async fn spawn(&self, task_id: &str) -> anyhow::Result<SpawnedAgent> {
        self.calls.lock().unwrap().push(task_id.to_string());
        Ok(SpawnedAgent {
            session_id: format!("s-{task_id}"),
            agent_id: format!("a-{task_id}"),
        })
    }
}

pub fn scheduler_with(provider: FixedProvider, runtime: Arc<RecordingRuntime>) -> EpicScheduler {
    EpicScheduler::new(
        Arc::new(provider),
        runtime,
        SchedulerOptions {
            stagger: Duration::ZERO,
            ..SchedulerOptions::default()
        },
    )
}
