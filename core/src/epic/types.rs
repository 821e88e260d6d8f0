use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Scheduling status of a child task inside the active epic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildStatus {
    Pending,
    Ready,
    InProgress,
    Completed,
    Blocked,
}

impl ChildStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    /// Completed and in-progress children are never re-classified.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Completed | Self::InProgress)
    }
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "ready" => Ok(Self::Ready),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            other => Err(format!("unknown child status: {other}")),
        }
    }
}

/// One unit of work within the active epic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildTask {
    pub id: String,
    pub title: String,
    /// Lower number = more urgent.
    pub priority: i64,
    pub status: ChildStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Agent currently working this child (set by a successful spawn).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChildTask {
    pub fn new(id: impl Into<String>, title: impl Into<String>, priority: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            priority,
            status: ChildStatus::Pending,
            assignee: None,
            depends_on: Vec::new(),
            agent_id: None,
            session_id: None,
        }
    }

    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Parallel,
    Sequential,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "parallel" => Ok(Self::Parallel),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// Which completed children need a manual approval pass.
///
/// Values outside the known set are kept verbatim so they round-trip through
/// config and the HTTP surface; they always require review.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReviewThreshold {
    All,
    P0,
    P0P1,
    #[default]
    P0P2,
    None,
    Unrecognized(String),
}

impl ReviewThreshold {
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "all",
            Self::P0 => "p0",
            Self::P0P1 => "p0-p1",
            Self::P0P2 => "p0-p2",
            Self::None => "none",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl FromStr for ReviewThreshold {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "all" => Self::All,
            "p0" => Self::P0,
            "p0-p1" => Self::P0P1,
            "p0-p2" => Self::P0P2,
            "none" => Self::None,
            _ => Self::Unrecognized(s.to_string()),
        })
    }
}

impl fmt::Display for ReviewThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReviewThreshold {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReviewThreshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.parse::<ReviewThreshold>() {
            Ok(threshold) => Ok(threshold),
            Err(never) => match never {},
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSettings {
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub review_threshold: ReviewThreshold,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_auto_spawn")]
    pub auto_spawn: bool,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_auto_spawn() -> bool {
    true
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            review_threshold: ReviewThreshold::default(),
            max_concurrent: default_max_concurrent(),
            auto_spawn: default_auto_spawn(),
        }
    }
}

impl ExecutionSettings {
    /// Ceiling actually enforced by the governor.
    pub fn effective_max_concurrent(&self) -> usize {
        match self.mode {
            ExecutionMode::Parallel => self.max_concurrent,
            ExecutionMode::Sequential => self.max_concurrent.min(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn percentage(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.completed * 100) / self.total
        }
    }
}

/// Outcome of a single spawn attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    pub task_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SpawnResult {
    pub fn spawned(task_id: &str, session_id: String, agent_id: String) -> Self {
        Self {
            success: true,
            session_id: Some(session_id),
            agent_id: Some(agent_id),
            task_id: task_id.to_string(),
            error: None,
        }
    }

    pub fn failed(task_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: None,
            agent_id: None,
            task_id: task_id.to_string(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: usize,
    pub ready: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub blocked: usize,
}

impl StatusCounts {
    pub fn from_children(children: &[ChildTask]) -> Self {
        children.iter().fold(Self::default(), |mut counts, child| {
            match child.status {
                ChildStatus::Pending => counts.pending += 1,
                ChildStatus::Ready => counts.ready += 1,
                ChildStatus::InProgress => counts.in_progress += 1,
                ChildStatus::Completed => counts.completed += 1,
                ChildStatus::Blocked => counts.blocked += 1,
            }
            counts
        })
    }
}

/// Point-in-time copy of the read surface, handed to presentation layers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicSnapshot {
    pub epic_id: Option<String>,
    pub title: Option<String>,
    pub active: bool,
    pub complete: bool,
    pub children: Vec<ChildTask>,
    pub progress: Progress,
    pub running_agents: Vec<String>,
    pub settings: Option<ExecutionSettings>,
    pub status_counts: StatusCounts,
    pub last_spawn_error: Option<String>,
}
