/// Running-agent bookkeeping against a ceiling.
///
/// The governor does no locking; `EpicScheduler` holds its spawn gate around
/// every check-then-spawn so the ceiling is never exceeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcurrencyGovernor {
    running: Vec<String>,
    max_concurrent: usize,
}

impl ConcurrencyGovernor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            running: Vec::new(),
            max_concurrent,
        }
    }

    pub fn can_spawn_more(&self) -> bool {
        self.running.len() < self.max_concurrent
    }

    pub fn available(&self) -> usize {
        self.max_concurrent.saturating_sub(self.running.len())
    }

    /// No-op when the agent is already tracked.
    pub fn add_running_agent(&mut self, agent_id: &str) {
        if !self.running.iter().any(|a| a == agent_id) {
            self.running.push(agent_id.to_string());
        }
    }

    pub fn remove_running_agent(&mut self, agent_id: &str) -> bool {
        let before = self.running.len();
        self.running.retain(|a| a != agent_id);
        self.running.len() != before
    }

    pub fn running(&self) -> &[String] {
        &self.running
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn set_max_concurrent(&mut self, max_concurrent: usize) {
        self.max_concurrent = max_concurrent;
    }
}
