use chrono::{DateTime, Local};
use epicflow_core::api::EpicScheduler;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub session_id: String,
    pub scheduler: EpicScheduler,
    pub stats: Arc<RwLock<ServerStats>>,
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(
        session_id: String,
        scheduler: EpicScheduler,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            session_id,
            scheduler,
            stats: Arc::new(RwLock::new(ServerStats::default())),
            shutdown_tx,
        }
    }

    pub async fn record_request(&self, route: &'static str) {
        self.stats.write().await.route_mut(route).requests += 1;
    }

    pub async fn record_error(&self, route: &'static str) {
        self.stats.write().await.route_mut(route).errors += 1;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    pub requests: u64,
    /// Requests the scheduler rejected.
    pub errors: u64,
}

/// Per-route counters for the lifetime of one `serve` session.
#[derive(Debug)]
pub struct ServerStats {
    routes: BTreeMap<&'static str, RouteStats>,
    started_at: DateTime<Local>,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self {
            routes: BTreeMap::new(),
            started_at: Local::now(),
        }
    }
}

impl ServerStats {
    fn route_mut(&mut self, route: &'static str) -> &mut RouteStats {
        self.routes.entry(route).or_default()
    }

    pub fn route(&self, route: &str) -> RouteStats {
        self.routes.get(route).copied().unwrap_or_default()
    }

    pub fn requests_total(&self) -> u64 {
        self.routes.values().map(|r| r.requests).sum()
    }

    pub fn errors_total(&self) -> u64 {
        self.routes.values().map(|r| r.errors).sum()
    }

    pub fn uptime_seconds(&self) -> f64 {
        (Local::now() - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests_support::{scheduler_with, FixedProvider, RecordingRuntime};

    fn state() -> AppState {
        let scheduler = scheduler_with(FixedProvider::chain(), Arc::new(RecordingRuntime::default()));
        let (shutdown_tx, _) = broadcast::channel(1);
        AppState::new("s".into(), scheduler, shutdown_tx)
    }

    #[tokio::test]
    async fn totals_sum_over_routes() {
        let state = state();
        state.record_request("/api/v1/epic").await;
        state.record_request("/api/v1/epic").await;
        state.record_request("/api/v1/tasks/complete").await;
        state.record_error("/api/v1/tasks/complete").await;

        let stats = state.stats.read().await;
        assert_eq!(stats.requests_total(), 3);
        assert_eq!(stats.errors_total(), 1);
        assert_eq!(
            stats.route("/api/v1/epic"),
            RouteStats {
                requests: 2,
                errors: 0
            }
        );
        assert_eq!(stats.route("/api/v1/tasks/complete").errors, 1);
        assert_eq!(stats.route("/health"), RouteStats::default());
        assert!(stats.uptime_seconds() < 1.0);
    }
}
