//! Collaborator seams: where task data comes from and where agents run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A child task as reported by the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderChild {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub priority: i64,
    /// Free-form source status ("open", "closed", "in_progress", ...).
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEpic {
    /// Empty when the source has no title; providers fall back to the epic id.
    #[serde(default)]
    pub epic_title: String,
    #[serde(default)]
    pub children: Vec<ProviderChild>,
}

/// Identifiers handed back by the agent runtime for a started agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnedAgent {
    pub session_id: String,
    pub agent_id: String,
}

#[async_trait]
pub trait TaskProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_children(&self, epic_id: &str) -> anyhow::Result<ProviderEpic>;
}

#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn name(&self) -> &str;
    async fn spawn(&self, task_id: &str) -> anyhow::Result<SpawnedAgent>;
}
