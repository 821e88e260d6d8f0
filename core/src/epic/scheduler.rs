//! Owned scheduler context for one active epic.
//!
//! All state lives behind a `RwLock`; every spawn decision (capacity check,
//! runtime call, registration) additionally runs under `spawn_gate`, so two
//! triggers can never both pass the capacity check for the same slot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::readiness::classify_initial;
use super::store::EpicState;
use super::types::{
    ChildTask, EpicSnapshot, ExecutionSettings, Progress, SpawnResult, StatusCounts,
};
use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::events::SchedulerEvent;
use crate::traits::{AgentRuntime, ProviderChild, TaskProvider};

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Pause between consecutive spawns of the initial wave.
    pub stagger: Duration,
    pub event_capacity: usize,
    /// Used when `launch` is called without explicit settings.
    pub default_settings: ExecutionSettings,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            stagger: Duration::from_millis(500),
            event_capacity: 256,
            default_settings: ExecutionSettings::default(),
        }
    }
}

impl From<&SchedulerConfig> for SchedulerOptions {
    fn from(cfg: &SchedulerConfig) -> Self {
        Self {
            stagger: Duration::from_millis(cfg.stagger_ms),
            event_capacity: cfg.event_capacity.max(1),
            default_settings: cfg.default_settings(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchReport {
    pub epic_id: String,
    pub title: String,
    pub total: usize,
    pub initial_wave: Vec<SpawnResult>,
}

#[derive(Clone)]
pub struct EpicScheduler {
    pub(crate) inner: Arc<SchedulerInner>,
}

pub(crate) struct SchedulerInner {
    pub(crate) provider: Arc<dyn TaskProvider>,
    pub(crate) runtime: Arc<dyn AgentRuntime>,
    pub(crate) state: RwLock<EpicState>,
    pub(crate) spawn_gate: Mutex<()>,
    pub(crate) events: broadcast::Sender<SchedulerEvent>,
    pub(crate) opts: SchedulerOptions,
}

pub(crate) fn validate_settings(settings: &ExecutionSettings) -> Result<(), SchedulerError> {
    if settings.max_concurrent == 0 {
        return Err(SchedulerError::InvalidSettings(
            "max_concurrent must be at least 1".to_string(),
        ));
    }
    Ok(())
}

impl EpicScheduler {
    pub fn new(
        provider: Arc<dyn TaskProvider>,
        runtime: Arc<dyn AgentRuntime>,
        opts: SchedulerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(opts.event_capacity.max(1));
        Self {
            inner: Arc::new(SchedulerInner {
                provider,
                runtime,
                state: RwLock::new(EpicState::new()),
                spawn_gate: Mutex::new(()),
                events,
                opts,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.inner.events.subscribe()
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.inner.opts
    }

    pub(crate) fn emit(&self, event: SchedulerEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Fetch the epic's children, install them as the active epic and, when
    /// auto-spawn is on, start the initial wave.
    ///
    /// A provider failure leaves the previous state untouched.
    pub async fn launch(
        &self,
        epic_id: &str,
        settings: Option<ExecutionSettings>,
    ) -> Result<LaunchReport, SchedulerError> {
        let settings = settings.unwrap_or_else(|| self.inner.opts.default_settings.clone());
        validate_settings(&settings)?;

        tracing::info!(
            epic_id = %epic_id,
            provider = self.inner.provider.name(),
            "fetching epic children"
        );
        let fetched = self
            .inner
            .provider
            .fetch_children(epic_id)
            .await
            .map_err(|e| {
                tracing::warn!(epic_id = %epic_id, error = %e, "task provider fetch failed");
                SchedulerError::ProviderFetch {
                    epic_id: epic_id.to_string(),
                    message: format!("{e:#}"),
                }
            })?;

        let auto_spawn = settings.auto_spawn;
        let title = fetched.epic_title.clone();
        let total = self
            .start(epic_id, &fetched.epic_title, &fetched.children, settings)
            .await?;

        let initial_wave = if auto_spawn {
            self.spawn_initial_wave().await
        } else {
            Vec::new()
        };

        Ok(LaunchReport {
            epic_id: epic_id.to_string(),
            title,
            total,
            initial_wave,
        })
    }

    /// Install an epic from already-fetched children without spawning.
    /// Returns the child count.
    pub async fn start(
        &self,
        epic_id: &str,
        title: &str,
        children: &[ProviderChild],
        settings: ExecutionSettings,
    ) -> Result<usize, SchedulerError> {
        validate_settings(&settings)?;
        let children = classify_initial(children);
        let total = children.len();

        let mut state = self.inner.state.write().await;
        if let Some(previous) = state.epic_id() {
            tracing::info!(previous = %previous, next = %epic_id, "replacing active epic");
        }
        state.start(epic_id.to_string(), title.to_string(), children, settings);

        let counts = state.status_counts();
        tracing::info!(
            epic_id = %epic_id,
            total,
            ready = counts.ready,
            blocked = counts.blocked,
            completed = counts.completed,
            "epic started"
        );
        self.emit(SchedulerEvent::EpicStarted {
            epic_id: epic_id.to_string(),
            total,
            timestamp: Utc::now(),
        });
        if state.take_stall_notice() {
            self.emit_stall(&state);
        }
        Ok(total)
    }

    /// Discard the active epic. Spawns still in flight are orphaned.
    pub async fn stop(&self) {
        let mut state = self.inner.state.write().await;
        let Some(epic_id) = state.epic_id().map(str::to_string) else {
            state.stop();
            return;
        };
        state.stop();
        tracing::info!(epic_id = %epic_id, "epic stopped");
        self.emit(SchedulerEvent::EpicStopped {
            epic_id,
            timestamp: Utc::now(),
        });
    }

    pub async fn update_settings(&self, settings: ExecutionSettings) -> Result<(), SchedulerError> {
        validate_settings(&settings)?;
        let mut state = self.inner.state.write().await;
        tracing::info!(
            max_concurrent = settings.max_concurrent,
            auto_spawn = settings.auto_spawn,
            "updating execution settings"
        );
        state.update_settings(settings)
    }

    pub(crate) fn emit_stall(&self, state: &EpicState) {
        let blocked = state.status_counts().blocked;
        let epic_id = state.epic_id().unwrap_or_default().to_string();
        tracing::warn!(
            epic_id = %epic_id,
            blocked,
            "epic stalled: nothing running and no ready children"
        );
        self.emit(SchedulerEvent::EpicStalled {
            epic_id,
            blocked,
            timestamp: Utc::now(),
        });
    }

    // ---- read surface ----

    pub async fn children(&self) -> Vec<ChildTask> {
        self.inner.state.read().await.children().to_vec()
    }

    pub async fn progress(&self) -> Progress {
        self.inner.state.read().await.progress()
    }

    pub async fn running_agents(&self) -> Vec<String> {
        self.inner.state.read().await.running_agents().to_vec()
    }

    pub async fn settings(&self) -> Option<ExecutionSettings> {
        self.inner.state.read().await.settings().cloned()
    }

    pub async fn is_active(&self) -> bool {
        self.inner.state.read().await.is_active()
    }

    pub async fn is_epic_complete(&self) -> bool {
        self.inner.state.read().await.is_epic_complete()
    }

    pub async fn is_stalled(&self) -> bool {
        self.inner.state.read().await.is_stalled()
    }

    pub async fn status_counts(&self) -> StatusCounts {
        self.inner.state.read().await.status_counts()
    }

    pub async fn last_spawn_error(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .last_spawn_error()
            .map(str::to_string)
    }

    pub async fn can_spawn_more(&self) -> bool {
        self.inner.state.read().await.can_spawn_more()
    }

    pub async fn requires_review(&self, priority: i64) -> bool {
        self.inner.state.read().await.requires_review(priority)
    }

    pub async fn snapshot(&self) -> EpicSnapshot {
        self.inner.state.read().await.snapshot()
    }
}
