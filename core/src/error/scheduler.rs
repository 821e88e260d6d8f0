use thiserror::Error;

/// Failures of scheduler operations.
///
/// Spawn failures and no-op conditions are not errors; they surface as
/// `SpawnResult`s or `None`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("task provider fetch failed for epic '{epic_id}': {message}")]
    ProviderFetch { epic_id: String, message: String },

    #[error("no active epic")]
    NoActiveEpic,

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

impl SchedulerError {
    /// Stable short code for API consumers.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProviderFetch { .. } => "provider_error",
            Self::NoActiveEpic => "no_active_epic",
            Self::UnknownTask(_) => "unknown_task",
            Self::InvalidSettings(_) => "invalid_settings",
        }
    }
}
