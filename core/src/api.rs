//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `epicflow_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, AgentRuntimeConfig, AppConfig, DryRunRuntimeConfig, FileProviderConfig,
    HttpEndpointConfig, HttpServerConfig, LoggingConfig, SchedulerConfig, TaskProviderConfig,
};
pub use crate::epic::{
    requires_review, ChildStatus, ChildTask, EpicScheduler, EpicSnapshot, ExecutionMode,
    ExecutionSettings, LaunchReport, Progress, ReviewThreshold, SchedulerOptions, SpawnResult,
    StatusCounts,
};
pub use crate::error::{CliError, SchedulerError};
pub use crate::events::SchedulerEvent;
pub use crate::traits::{AgentRuntime, ProviderChild, ProviderEpic, SpawnedAgent, TaskProvider};
