use anyhow::Result;
use async_trait::async_trait;
use epicflow_core::api::{AgentRuntime, SpawnedAgent};
use uuid::Uuid;

/// Pretends to start agents. Useful for rehearsing an epic's wave order.
#[derive(Debug, Default)]
pub struct DryRunAgentRuntime;

impl DryRunAgentRuntime {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AgentRuntime for DryRunAgentRuntime {
    fn name(&self) -> &str {
        "dry_run_agent_runtime"
    }

    async fn spawn(&self, task_id: &str) -> Result<SpawnedAgent> {
        let agent = SpawnedAgent {
            session_id: Uuid::new_v4().to_string(),
            agent_id: format!("dry-run-{}", Uuid::new_v4()),
        };
        tracing::info!(
            task_id = %task_id,
            agent_id = %agent.agent_id,
            "dry run: agent not actually started"
        );
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fabricates_distinct_ids() {
        let rt = DryRunAgentRuntime::new();
        let a = rt.spawn("t1").await.unwrap();
        let b = rt.spawn("t1").await.unwrap();
        assert_ne!(a.agent_id, b.agent_id);
        assert!(a.agent_id.starts_with("dry-run-"));
        assert!(Uuid::parse_str(&a.session_id).is_ok());
    }
}
