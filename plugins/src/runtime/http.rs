use anyhow::Result;
use async_trait::async_trait;
use epicflow_core::api::{AgentRuntime, SpawnedAgent};

use crate::http_client::HttpClient;

pub struct HttpAgentRuntime {
    client: HttpClient,
}

impl HttpAgentRuntime {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> Result<Self> {
        let client = HttpClient::new(base_url, api_key, timeout_ms)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    fn name(&self) -> &str {
        "http_agent_runtime"
    }

    async fn spawn(&self, task_id: &str) -> Result<SpawnedAgent> {
        let agent = self.client.spawn_agent(task_id).await?;
        if agent.agent_id.trim().is_empty() {
            anyhow::bail!("agent runtime returned an empty agent id for task {task_id}");
        }
        Ok(agent)
    }
}
