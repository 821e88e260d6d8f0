//! Change notifications emitted after each scheduler state transition.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::epic::types::{ChildStatus, Progress};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchedulerEvent {
    EpicStarted {
        epic_id: String,
        total: usize,
        timestamp: DateTime<Utc>,
    },
    TaskStatusChanged {
        task_id: String,
        status: ChildStatus,
        timestamp: DateTime<Utc>,
    },
    AgentSpawned {
        task_id: String,
        agent_id: String,
        session_id: String,
        running: usize,
        timestamp: DateTime<Utc>,
    },
    SpawnFailed {
        task_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        progress: Progress,
        timestamp: DateTime<Utc>,
    },
    EpicCompleted {
        epic_id: String,
        timestamp: DateTime<Utc>,
    },
    EpicStopped {
        epic_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A spawn came back after its epic was stopped or replaced.
    OrphanedSpawn {
        task_id: String,
        agent_id: String,
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    EpicStalled {
        epic_id: String,
        blocked: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SchedulerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EpicStarted { .. } => "epic_started",
            Self::TaskStatusChanged { .. } => "task_status_changed",
            Self::AgentSpawned { .. } => "agent_spawned",
            Self::SpawnFailed { .. } => "spawn_failed",
            Self::TaskCompleted { .. } => "task_completed",
            Self::EpicCompleted { .. } => "epic_completed",
            Self::EpicStopped { .. } => "epic_stopped",
            Self::OrphanedSpawn { .. } => "orphaned_spawn",
            Self::EpicStalled { .. } => "epic_stalled",
        }
    }
}
