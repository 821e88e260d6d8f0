//! The single active epic and its read accessors.

use super::governor::ConcurrencyGovernor;
use super::readiness::{ids_with_status, recompute_readiness};
use super::review::requires_review;
use super::types::{
    ChildStatus, ChildTask, EpicSnapshot, ExecutionSettings, Progress, SpawnResult, StatusCounts,
};
use crate::error::SchedulerError;

/// What a completion changed, for the caller to act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub released_agent: Option<String>,
    /// Blocked before the completion and ready after it.
    pub newly_unblocked: Vec<String>,
    pub epic_complete: bool,
}

#[derive(Debug, Default)]
pub struct EpicState {
    epic_id: Option<String>,
    title: Option<String>,
    children: Vec<ChildTask>,
    settings: Option<ExecutionSettings>,
    progress: Progress,
    governor: ConcurrencyGovernor,
    last_spawn_error: Option<String>,
    generation: u64,
    stall_reported: bool,
}

impl EpicState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new epic, discarding whatever was active.
    pub fn start(
        &mut self,
        epic_id: String,
        title: String,
        children: Vec<ChildTask>,
        settings: ExecutionSettings,
    ) -> u64 {
        let generation = self.generation + 1;
        *self = Self {
            epic_id: Some(epic_id),
            title: Some(title),
            progress: Progress {
                completed: 0,
                total: children.len(),
            },
            governor: ConcurrencyGovernor::new(settings.effective_max_concurrent()),
            children,
            settings: Some(settings),
            last_spawn_error: None,
            generation,
            stall_reported: false,
        };
        self.refresh_progress();
        generation
    }

    /// Drop everything unconditionally. In-flight spawns become orphans.
    pub fn stop(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::default()
        };
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn epic_id(&self) -> Option<&str> {
        self.epic_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn children(&self) -> &[ChildTask] {
        &self.children
    }

    pub fn child(&self, task_id: &str) -> Option<&ChildTask> {
        self.children.iter().find(|c| c.id == task_id)
    }

    fn child_mut(&mut self, task_id: &str) -> Result<&mut ChildTask, SchedulerError> {
        self.children
            .iter_mut()
            .find(|c| c.id == task_id)
            .ok_or_else(|| SchedulerError::UnknownTask(task_id.to_string()))
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn running_agents(&self) -> &[String] {
        self.governor.running()
    }

    pub fn settings(&self) -> Option<&ExecutionSettings> {
        self.settings.as_ref()
    }

    pub fn governor(&self) -> &ConcurrencyGovernor {
        &self.governor
    }

    pub fn is_active(&self) -> bool {
        self.epic_id.is_some()
    }

    pub fn is_epic_complete(&self) -> bool {
        self.progress.total > 0 && self.progress.completed == self.progress.total
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::from_children(&self.children)
    }

    pub fn last_spawn_error(&self) -> Option<&str> {
        self.last_spawn_error.as_deref()
    }

    pub fn can_spawn_more(&self) -> bool {
        self.is_active() && self.governor.can_spawn_more()
    }

    /// Active and unfinished, but nothing running and nothing spawnable.
    pub fn is_stalled(&self) -> bool {
        self.is_active()
            && !self.is_epic_complete()
            && self.governor.running().is_empty()
            && !self.children.iter().any(|c| c.status == ChildStatus::Ready)
            && !self
                .children
                .iter()
                .any(|c| c.status == ChildStatus::InProgress)
    }

    /// Returns true the first time a stall is seen since the last progress.
    pub fn take_stall_notice(&mut self) -> bool {
        if self.is_stalled() && !self.stall_reported {
            self.stall_reported = true;
            return true;
        }
        false
    }

    pub fn requires_review(&self, priority: i64) -> bool {
        let default = ExecutionSettings::default();
        let settings = self.settings.as_ref().unwrap_or(&default);
        requires_review(priority, &settings.review_threshold)
    }

    pub fn update_settings(&mut self, settings: ExecutionSettings) -> Result<(), SchedulerError> {
        if !self.is_active() {
            return Err(SchedulerError::NoActiveEpic);
        }
        self.governor
            .set_max_concurrent(settings.effective_max_concurrent());
        self.settings = Some(settings);
        Ok(())
    }

    fn refresh_progress(&mut self) {
        self.progress.completed = self
            .children
            .iter()
            .filter(|c| c.status == ChildStatus::Completed)
            .count();
    }

    /// Apply the result of a spawn attempt for `result.task_id`.
    pub fn record_spawn(&mut self, result: &SpawnResult) {
        if !result.success {
            self.last_spawn_error = result.error.clone();
            return;
        }

        let (Some(agent_id), Some(session_id)) = (&result.agent_id, &result.session_id) else {
            return;
        };

        if let Ok(child) = self.child_mut(&result.task_id) {
            child.status = ChildStatus::InProgress;
            child.agent_id = Some(agent_id.clone());
            child.session_id = Some(session_id.clone());
        }
        self.governor.add_running_agent(agent_id);
        self.stall_reported = false;
    }

    /// Detach the child's agent and free its slot.
    fn release_agent(&mut self, task_id: &str) -> Result<Option<String>, SchedulerError> {
        let child = self.child_mut(task_id)?;
        child.session_id = None;
        let agent_id = child.agent_id.take();
        if let Some(agent_id) = agent_id.as_deref() {
            self.governor.remove_running_agent(agent_id);
        }
        Ok(agent_id)
    }

    /// Mark a child completed, release its agent and recompute readiness.
    ///
    /// A child that is already completed (e.g. by a manual override) only
    /// has its agent released.
    pub fn complete_child(&mut self, task_id: &str) -> Result<CompletionOutcome, SchedulerError> {
        if self.child_mut(task_id)?.status == ChildStatus::Completed {
            return Ok(CompletionOutcome {
                released_agent: self.release_agent(task_id)?,
                epic_complete: self.is_epic_complete(),
                ..CompletionOutcome::default()
            });
        }
        let released_agent = self.child_mut(task_id)?.agent_id.clone();
        if let Some(agent_id) = released_agent.as_deref() {
            self.governor.remove_running_agent(agent_id);
        }

        let blocked_before = ids_with_status(&self.children, ChildStatus::Blocked);

        let child = self.child_mut(task_id)?;
        child.status = ChildStatus::Completed;
        child.assignee = None;
        child.agent_id = None;
        child.session_id = None;

        self.refresh_progress();
        recompute_readiness(&mut self.children);

        let newly_unblocked = self
            .children
            .iter()
            .filter(|c| c.status == ChildStatus::Ready && blocked_before.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();

        Ok(CompletionOutcome {
            released_agent,
            newly_unblocked,
            epic_complete: self.is_epic_complete(),
        })
    }

    /// Manual status write. Completion recomputes progress and readiness but
    /// never cascades into a spawn.
    pub fn set_status(
        &mut self,
        task_id: &str,
        status: ChildStatus,
        assignee: Option<String>,
    ) -> Result<(), SchedulerError> {
        let child = self.child_mut(task_id)?;
        child.status = status;
        if assignee.is_some() {
            child.assignee = assignee;
        }

        self.refresh_progress();
        if status == ChildStatus::Completed {
            recompute_readiness(&mut self.children);
        }
        Ok(())
    }

    pub fn snapshot(&self) -> EpicSnapshot {
        EpicSnapshot {
            epic_id: self.epic_id.clone(),
            title: self.title.clone(),
            active: self.is_active(),
            complete: self.is_epic_complete(),
            children: self.children.clone(),
            progress: self.progress,
            running_agents: self.governor.running().to_vec(),
            settings: self.settings.clone(),
            status_counts: self.status_counts(),
            last_spawn_error: self.last_spawn_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epic::readiness::classify_initial;
    use crate::traits::ProviderChild;

    fn child(id: &str, priority: i64, blocked_by: &[&str]) -> ProviderChild {
        ProviderChild {
            id: id.to_string(),
            title: id.to_string(),
            priority,
            status: "open".to_string(),
            assignee: Some("someone".to_string()),
            blocked_by: blocked_by.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn started(children: &[ProviderChild], max: usize) -> EpicState {
        let mut state = EpicState::new();
        state.start(
            "epic-1".to_string(),
            "Epic".to_string(),
            classify_initial(children),
            ExecutionSettings {
                max_concurrent: max,
                ..ExecutionSettings::default()
            },
        );
        state
    }

    #[test]
    fn start_sets_total_and_stop_resets() {
        let mut state = started(&[child("a", 0, &[]), child("b", 1, &[])], 2);
        assert!(state.is_active());
        assert_eq!(state.progress(), Progress { completed: 0, total: 2 });
        let gen = state.generation();

        state.stop();
        assert!(!state.is_active());
        assert!(state.children().is_empty());
        assert_eq!(state.progress(), Progress::default());
        assert!(state.running_agents().is_empty());
        assert!(state.settings().is_none());
        assert!(state.generation() > gen);
    }

    #[test]
    fn completion_reports_newly_unblocked() {
        let mut state = started(
            &[child("a", 1, &[]), child("b", 0, &["a"]), child("c", 2, &["a", "b"])],
            1,
        );
        state.record_spawn(&SpawnResult::spawned("a", "s1".into(), "ag1".into()));
        assert_eq!(state.running_agents(), &["ag1".to_string()]);

        let outcome = state.complete_child("a").unwrap();
        assert_eq!(outcome.released_agent.as_deref(), Some("ag1"));
        assert_eq!(outcome.newly_unblocked, vec!["b".to_string()]);
        assert!(!outcome.epic_complete);
        assert!(state.running_agents().is_empty());

        let a = state.child("a").unwrap();
        assert_eq!(a.status, ChildStatus::Completed);
        assert!(a.assignee.is_none());
        assert_eq!(state.child("c").unwrap().status, ChildStatus::Blocked);
    }

    #[test]
    fn repeated_completion_is_idempotent() {
        let mut state = started(&[child("a", 0, &[]), child("b", 0, &[])], 1);
        state.complete_child("a").unwrap();
        let again = state.complete_child("a").unwrap();
        assert!(again.newly_unblocked.is_empty());
        assert!(again.released_agent.is_none());
        assert_eq!(state.progress().completed, 1);
    }

    #[test]
    fn completion_after_manual_override_frees_the_slot() {
        let mut state = started(&[child("a", 0, &[]), child("b", 0, &["a"])], 1);
        state.record_spawn(&SpawnResult::spawned("a", "s1".into(), "ag1".into()));
        state.set_status("a", ChildStatus::Completed, None).unwrap();
        assert!(!state.can_spawn_more());

        let outcome = state.complete_child("a").unwrap();
        assert_eq!(outcome.released_agent.as_deref(), Some("ag1"));
        assert!(outcome.newly_unblocked.is_empty());
        assert!(state.can_spawn_more());
        assert!(state.child("a").unwrap().session_id.is_none());
        assert_eq!(state.progress().completed, 1);
    }

    #[test]
    fn unknown_task_is_an_error() {
        let mut state = started(&[child("a", 0, &[])], 1);
        assert!(matches!(
            state.complete_child("zzz"),
            Err(SchedulerError::UnknownTask(_))
        ));
    }

    #[test]
    fn failed_spawn_leaves_child_untouched() {
        let mut state = started(&[child("a", 0, &[])], 1);
        state.record_spawn(&SpawnResult::failed("a", "runtime down"));
        assert_eq!(state.child("a").unwrap().status, ChildStatus::Ready);
        assert_eq!(state.last_spawn_error(), Some("runtime down"));
        assert!(state.running_agents().is_empty());
    }

    #[test]
    fn manual_completion_recomputes_without_agent_release() {
        let mut state = started(&[child("a", 0, &[]), child("b", 0, &["a"])], 1);
        state
            .set_status("a", ChildStatus::Completed, Some("reviewer".into()))
            .unwrap();
        assert_eq!(state.progress().completed, 1);
        assert_eq!(state.child("b").unwrap().status, ChildStatus::Ready);
        assert_eq!(
            state.child("a").unwrap().assignee.as_deref(),
            Some("reviewer")
        );
    }

    #[test]
    fn cyclic_epic_is_stalled_once() {
        let mut state = started(&[child("a", 0, &["b"]), child("b", 0, &["a"])], 1);
        assert!(state.is_stalled());
        assert!(state.take_stall_notice());
        assert!(!state.take_stall_notice());
    }

    #[test]
    fn review_predicate_follows_settings() {
        let mut state = started(&[child("a", 0, &[])], 1);
        let mut settings = state.settings().cloned().unwrap();
        settings.review_threshold = crate::epic::types::ReviewThreshold::None;
        state.update_settings(settings).unwrap();
        assert!(!state.requires_review(0));
    }
}
