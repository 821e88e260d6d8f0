use anyhow::Result;
use async_trait::async_trait;
use epicflow_core::api::{ProviderEpic, TaskProvider};

use super::with_title_fallback;
use crate::http_client::HttpClient;

pub struct HttpTaskProvider {
    client: HttpClient,
}

impl HttpTaskProvider {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> Result<Self> {
        let client = HttpClient::new(base_url, api_key, timeout_ms)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TaskProvider for HttpTaskProvider {
    fn name(&self) -> &str {
        "http_task_provider"
    }

    async fn fetch_children(&self, epic_id: &str) -> Result<ProviderEpic> {
        tracing::debug!(
            target: "epicflow.provider",
            stage = "provider.plugin.fetch.in",
            epic_id = %epic_id,
            base_url = %self.client.base_url()
        );
        let epic = self.client.epic_children(epic_id).await?;
        let epic = with_title_fallback(epic, epic_id);
        tracing::debug!(
            target: "epicflow.provider",
            stage = "provider.plugin.fetch.out",
            epic_id = %epic_id,
            children = epic.children.len()
        );
        Ok(epic)
    }
}
