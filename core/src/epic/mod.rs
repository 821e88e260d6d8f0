//! Epic execution scheduling.
//!
//! ```text
//! TaskProvider::fetch_children()
//!   ↓
//! readiness::classify_initial() → ready / blocked / completed / in_progress
//!   ↓
//! EpicScheduler::spawn_initial_wave() ── AgentRuntime::spawn() per ready child
//!   ↓
//! EpicScheduler::complete_task() → recompute readiness → cascade spawn
//! ```

mod cascade;
pub mod governor;
pub mod readiness;
pub mod review;
mod scheduler;
pub mod spawn;
pub mod store;
pub mod types;

pub use governor::ConcurrencyGovernor;
pub use readiness::{classify_initial, recompute_readiness};
pub use review::requires_review;
pub use scheduler::{EpicScheduler, LaunchReport, SchedulerOptions};
pub use spawn::spawn_for_task;
pub use store::{CompletionOutcome, EpicState};
pub use types::{
    ChildStatus, ChildTask, EpicSnapshot, ExecutionMode, ExecutionSettings, Progress,
    ReviewThreshold, SpawnResult, StatusCounts,
};
