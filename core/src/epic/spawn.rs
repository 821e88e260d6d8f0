use chrono::Utc;

use super::readiness::ready_by_priority;
use super::scheduler::EpicScheduler;
use super::types::{ChildStatus, SpawnResult};
use crate::events::SchedulerEvent;
use crate::traits::AgentRuntime;

pub const NOTHING_SPAWNABLE: &str = "no ready tasks to spawn";
pub const NO_CAPACITY: &str = "no free agent slots";
pub const NO_ACTIVE_EPIC: &str = "no active epic";
pub const ORPHANED_SPAWN: &str = "epic stopped before spawn completed";
pub const TASK_NO_LONGER_READY: &str = "task left ready state before spawn completed";

/// One call to the agent runtime. Never touches scheduler state.
pub async fn spawn_for_task(runtime: &dyn AgentRuntime, task_id: &str) -> SpawnResult {
    tracing::debug!(task_id = %task_id, runtime = runtime.name(), "requesting agent");
    match runtime.spawn(task_id).await {
        Ok(agent) => SpawnResult::spawned(task_id, agent.session_id, agent.agent_id),
        Err(e) => {
            tracing::warn!(task_id = %task_id, error = %e, "agent spawn failed");
            SpawnResult::failed(task_id, format!("{e:#}"))
        }
    }
}

impl EpicScheduler {
    /// Spawn an agent for `task_id` and register the outcome.
    ///
    /// The caller must hold the spawn gate and have checked capacity. If the
    /// epic generation moved, or the task left `Ready` (e.g. it was completed)
    /// while the runtime call was in flight, the result is dropped and
    /// reported as an orphan.
    pub(crate) async fn spawn_and_register(&self, task_id: &str, generation: u64) -> SpawnResult {
        let result = spawn_for_task(self.inner.runtime.as_ref(), task_id).await;

        let mut state = self.inner.state.write().await;
        let reason = if state.generation() != generation {
            Some(ORPHANED_SPAWN)
        } else if result.success
            && state.child(task_id).map(|c| c.status) != Some(ChildStatus::Ready)
        {
            Some(TASK_NO_LONGER_READY)
        } else {
            None
        };
        if let Some(reason) = reason {
            if let (Some(agent_id), Some(session_id)) = (&result.agent_id, &result.session_id) {
                tracing::warn!(
                    task_id = %task_id,
                    agent_id = %agent_id,
                    reason,
                    "dropping spawned agent"
                );
                self.emit(SchedulerEvent::OrphanedSpawn {
                    task_id: task_id.to_string(),
                    agent_id: agent_id.clone(),
                    session_id: session_id.clone(),
                    timestamp: Utc::now(),
                });
            }
            return SpawnResult::failed(task_id, reason);
        }

        state.record_spawn(&result);
        match (&result.agent_id, &result.session_id, &result.error) {
            (Some(agent_id), Some(session_id), _) => {
                let running = state.running_agents().len();
                tracing::info!(
                    task_id = %task_id,
                    agent_id = %agent_id,
                    running,
                    max = state.governor().max_concurrent(),
                    "agent spawned"
                );
                self.emit(SchedulerEvent::AgentSpawned {
                    task_id: task_id.to_string(),
                    agent_id: agent_id.clone(),
                    session_id: session_id.clone(),
                    running,
                    timestamp: Utc::now(),
                });
                self.emit(SchedulerEvent::TaskStatusChanged {
                    task_id: task_id.to_string(),
                    status: ChildStatus::InProgress,
                    timestamp: Utc::now(),
                });
            }
            (_, _, error) => {
                self.emit(SchedulerEvent::SpawnFailed {
                    task_id: task_id.to_string(),
                    error: error.clone().unwrap_or_default(),
                    timestamp: Utc::now(),
                });
                if state.take_stall_notice() {
                    self.emit_stall(&state);
                }
            }
        }
        result
    }

    /// Spawn the first batch of ready children in priority order, pausing
    /// between spawns. A failed spawn does not stop the rest of the wave.
    pub async fn spawn_initial_wave(&self) -> Vec<SpawnResult> {
        let _gate = self.inner.spawn_gate.lock().await;

        let (plan, generation) = {
            let state = self.inner.state.read().await;
            if !state.is_active() {
                return vec![SpawnResult::failed("", NO_ACTIVE_EPIC)];
            }
            let ready = ready_by_priority(state.children());
            if ready.is_empty() {
                tracing::info!("initial wave: nothing spawnable");
                return vec![SpawnResult::failed("", NOTHING_SPAWNABLE)];
            }
            let slots = state.governor().available();
            if slots == 0 {
                return vec![SpawnResult::failed("", NO_CAPACITY)];
            }
            let plan: Vec<String> = ready
                .into_iter()
                .take(slots)
                .map(|c| c.id.clone())
                .collect();
            (plan, state.generation())
        };

        tracing::info!(count = plan.len(), "spawning initial wave");
        let mut results = Vec::with_capacity(plan.len());
        for (idx, task_id) in plan.iter().enumerate() {
            if idx > 0 && !self.inner.opts.stagger.is_zero() {
                tokio::time::sleep(self.inner.opts.stagger).await;
            }

            {
                let state = self.inner.state.read().await;
                if state.generation() != generation {
                    tracing::info!("epic changed during initial wave; abandoning the rest");
                    break;
                }
                if !state.can_spawn_more() {
                    break;
                }
            }

            results.push(self.spawn_and_register(task_id, generation).await);
        }
        results
    }
}
