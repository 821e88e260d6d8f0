use chrono::Utc;

use super::readiness::ready_by_priority;
use super::scheduler::EpicScheduler;
use super::store::EpicState;
use super::types::{ChildStatus, SpawnResult};
use crate::error::SchedulerError;
use crate::events::SchedulerEvent;

impl EpicScheduler {
    /// Record a child's completion and, if allowed, spawn the most urgent
    /// child that this completion unblocked.
    ///
    /// Returns the cascade's spawn result, or `None` when nothing was spawned.
    pub async fn complete_task(&self, task_id: &str) -> Result<Option<SpawnResult>, SchedulerError> {
        let (newly_unblocked, generation, auto_spawn) = {
            let mut state = self.inner.state.write().await;
            if !state.is_active() {
                return Err(SchedulerError::NoActiveEpic);
            }
            let already_done = state
                .child(task_id)
                .map(|c| c.status == ChildStatus::Completed)
                .ok_or_else(|| SchedulerError::UnknownTask(task_id.to_string()))?;
            if already_done {
                match state.complete_child(task_id)?.released_agent {
                    Some(agent_id) => tracing::info!(
                        task_id = %task_id,
                        agent_id = %agent_id,
                        "released agent of already completed task"
                    ),
                    None => tracing::debug!(task_id = %task_id, "completion for already completed task ignored"),
                }
                if state.take_stall_notice() {
                    self.emit_stall(&state);
                }
                return Ok(None);
            }

            let outcome = state.complete_child(task_id)?;
            let progress = state.progress();
            tracing::info!(
                task_id = %task_id,
                agent_id = ?outcome.released_agent,
                completed = progress.completed,
                total = progress.total,
                unblocked = outcome.newly_unblocked.len(),
                "task completed"
            );

            self.emit(SchedulerEvent::TaskCompleted {
                task_id: task_id.to_string(),
                progress,
                timestamp: Utc::now(),
            });
            for id in &outcome.newly_unblocked {
                self.emit(SchedulerEvent::TaskStatusChanged {
                    task_id: id.clone(),
                    status: ChildStatus::Ready,
                    timestamp: Utc::now(),
                });
            }
            if outcome.epic_complete {
                self.emit_epic_completed(&state);
            } else if state.take_stall_notice() {
                self.emit_stall(&state);
            }

            let auto_spawn = state.settings().map(|s| s.auto_spawn).unwrap_or(false);
            (outcome.newly_unblocked, state.generation(), auto_spawn)
        };

        if !auto_spawn || newly_unblocked.is_empty() {
            return Ok(None);
        }

        let _gate = self.inner.spawn_gate.lock().await;
        let candidate = {
            let state = self.inner.state.read().await;
            if state.generation() != generation || !state.can_spawn_more() {
                return Ok(None);
            }
            ready_by_priority(state.children())
                .into_iter()
                .find(|c| newly_unblocked.contains(&c.id))
                .map(|c| c.id.clone())
        };

        let Some(next) = candidate else {
            return Ok(None);
        };
        tracing::info!(completed = %task_id, next = %next, "cascading into unblocked task");
        Ok(Some(self.spawn_and_register(&next, generation).await))
    }

    /// Manual status override. Completion updates progress and readiness
    /// but never cascades into a spawn.
    pub async fn update_task_status(
        &self,
        task_id: &str,
        status: ChildStatus,
        assignee: Option<String>,
    ) -> Result<(), SchedulerError> {
        let mut state = self.inner.state.write().await;
        if !state.is_active() {
            return Err(SchedulerError::NoActiveEpic);
        }

        let was_complete = state.is_epic_complete();
        state.set_status(task_id, status, assignee)?;
        tracing::info!(task_id = %task_id, status = %status, "task status overridden");
        self.emit(SchedulerEvent::TaskStatusChanged {
            task_id: task_id.to_string(),
            status,
            timestamp: Utc::now(),
        });

        if !was_complete && state.is_epic_complete() {
            self.emit_epic_completed(&state);
        }
        Ok(())
    }

    /// Spawn the most urgent ready child if a slot is free.
    ///
    /// Returns `None` when another spawn pass is in flight, the epic is
    /// inactive, there is no capacity or nothing is ready.
    pub async fn spawn_next_agent(&self) -> Option<SpawnResult> {
        let Ok(_gate) = self.inner.spawn_gate.try_lock() else {
            tracing::debug!("spawn already in flight; skipping");
            return None;
        };

        let (next, generation) = {
            let state = self.inner.state.read().await;
            if !state.can_spawn_more() {
                return None;
            }
            let next = ready_by_priority(state.children()).first()?.id.clone();
            (next, state.generation())
        };

        Some(self.spawn_and_register(&next, generation).await)
    }

    fn emit_epic_completed(&self, state: &EpicState) {
        let epic_id = state.epic_id().unwrap_or_default().to_string();
        tracing::info!(epic_id = %epic_id, "all children completed");
        self.emit(SchedulerEvent::EpicCompleted {
            epic_id,
            timestamp: Utc::now(),
        });
    }
}
