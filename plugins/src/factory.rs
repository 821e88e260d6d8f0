use std::sync::Arc;

use anyhow::Result;

use epicflow_core::api::{AgentRuntime, AgentRuntimeConfig, AppConfig, TaskProvider, TaskProviderConfig};

use crate::provider::{FileTaskProvider, HttpTaskProvider};
use crate::runtime::{DryRunAgentRuntime, HttpAgentRuntime};

pub fn build_task_provider(cfg: &AppConfig) -> Result<Arc<dyn TaskProvider>> {
    match &cfg.task_provider {
        TaskProviderConfig::Http(http) => Ok(Arc::new(HttpTaskProvider::new(
            http.base_url.clone(),
            http.api_key.clone(),
            http.timeout_ms,
        )?)),
        TaskProviderConfig::File(file) => {
            if file.path.trim().is_empty() {
                anyhow::bail!("task_provider.path must be set for the file provider");
            }
            Ok(Arc::new(FileTaskProvider::new(&file.path)))
        }
    }
}

pub fn build_agent_runtime(cfg: &AppConfig) -> Result<Arc<dyn AgentRuntime>> {
    match &cfg.agent_runtime {
        AgentRuntimeConfig::Http(http) => Ok(Arc::new(HttpAgentRuntime::new(
            http.base_url.clone(),
            http.api_key.clone(),
            http.timeout_ms,
        )?)),
        AgentRuntimeConfig::DryRun(_) => Ok(Arc::new(DryRunAgentRuntime::new())),
    }
}
