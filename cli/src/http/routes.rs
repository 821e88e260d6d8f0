use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Local;
use epicflow_core::api::{EpicSnapshot, SpawnResult};

use crate::http::{models::*, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/epic", get(snapshot_handler))
        .route("/api/v1/epic/launch", post(launch_handler))
        .route("/api/v1/epic/stop", post(stop_handler))
        .route("/api/v1/epic/settings", put(settings_handler))
        .route("/api/v1/tasks/:task_id/complete", post(complete_handler))
        .route("/api/v1/tasks/:task_id/status", put(status_handler))
        .route("/api/v1/spawn-next", post(spawn_next_handler))
        .route("/api/v1/review", get(review_handler))
        .route("/api/v1/shutdown", post(shutdown_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// POST /api/v1/epic/launch
async fn launch_handler(
    State(state): State<AppState>,
    Json(req): Json<LaunchRequest>,
) -> Result<Json<ApiResponse<LaunchData>>, HttpServerError> {
    state.record_request("/api/v1/epic/launch").await;

    let epic_id = req.epic_id.trim();
    if epic_id.is_empty() {
        return Err(HttpServerError::InvalidRequest("epicId must not be empty".into()));
    }

    match state.scheduler.launch(epic_id, req.settings).await {
        Ok(report) => {
            let snapshot = state.scheduler.snapshot().await;
            Ok(Json(ApiResponse::ok(LaunchData { report, snapshot })))
        }
        Err(e) => {
            state.record_error("/api/v1/epic/launch").await;
            Err(e.into())
        }
    }
}

/// POST /api/v1/epic/stop
async fn stop_handler(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.record_request("/api/v1/epic/stop").await;
    state.scheduler.stop().await;
    Json(ApiResponse::empty())
}

/// GET /api/v1/epic
async fn snapshot_handler(State(state): State<AppState>) -> Json<ApiResponse<EpicSnapshot>> {
    state.record_request("/api/v1/epic").await;
    Json(ApiResponse::ok(state.scheduler.snapshot().await))
}

/// PUT /api/v1/epic/settings
async fn settings_handler(
    State(state): State<AppState>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<ApiResponse<EpicSnapshot>>, HttpServerError> {
    state.record_request("/api/v1/epic/settings").await;
    if let Err(e) = state.scheduler.update_settings(req.settings).await {
        state.record_error("/api/v1/epic/settings").await;
        return Err(e.into());
    }
    Ok(Json(ApiResponse::ok(state.scheduler.snapshot().await)))
}

/// POST /api/v1/tasks/:task_id/complete
///
/// `data` is the spawn triggered by the completion, if any.
async fn complete_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<ApiResponse<Option<SpawnResult>>>, HttpServerError> {
    state.record_request("/api/v1/tasks/complete").await;
    match state.scheduler.complete_task(&task_id).await {
        Ok(cascade) => Ok(Json(ApiResponse::ok(cascade))),
        Err(e) => {
            state.record_error("/api/v1/tasks/complete").await;
            Err(e.into())
        }
    }
}

/// PUT /api/v1/tasks/:task_id/status
async fn status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<ApiResponse<()>>, HttpServerError> {
    state.record_request("/api/v1/tasks/status").await;
    match state
        .scheduler
        .update_task_status(&task_id, req.status, req.assignee)
        .await
    {
        Ok(()) => Ok(Json(ApiResponse::empty())),
        Err(e) => {
            state.record_error("/api/v1/tasks/status").await;
            Err(e.into())
        }
    }
}

/// POST /api/v1/spawn-next
///
/// `data` is `null` when nothing was spawned.
async fn spawn_next_handler(State(state): State<AppState>) -> Json<ApiResponse<Option<SpawnResult>>> {
    state.record_request("/api/v1/spawn-next").await;
    Json(ApiResponse::ok(state.scheduler.spawn_next_agent().await))
}

/// GET /api/v1/review?priority=N
async fn review_handler(
    State(state): State<AppState>,
    Query(q): Query<ReviewQuery>,
) -> Json<ApiResponse<ReviewData>> {
    state.record_request("/api/v1/review").await;
    Json(ApiResponse::ok(ReviewData {
        priority: q.priority,
        requires_review: state.scheduler.requires_review(q.priority).await,
    }))
}

/// POST /api/v1/shutdown
async fn shutdown_handler(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    let _ = state.shutdown_tx.send(());
    Json(ApiResponse::empty())
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.scheduler.snapshot().await;
    let stats = state.stats.read().await;

    Json(HealthResponse {
        status: "healthy".into(),
        session_id: state.session_id.clone(),
        uptime_seconds: stats.uptime_seconds(),
        requests_handled: stats.requests_total(),
        requests_failed: stats.errors_total(),
        active_epic: snapshot.epic_id,
        timestamp: Local::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests_support::{scheduler_with, FixedProvider, RecordingRuntime};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use epicflow_core::api::{ChildStatus, ExecutionSettings};
    use std::sync::Arc;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    fn create_test_state(provider: FixedProvider) -> (AppState, Arc<RecordingRuntime>) {
        let runtime = Arc::new(RecordingRuntime::default());
        let scheduler = scheduler_with(provider, runtime.clone());
        let (shutdown_tx, _) = broadcast::channel(1);
        (
            AppState::new("test-session".into(), scheduler, shutdown_tx),
            runtime,
        )
    }

    fn launch_req(max: usize) -> LaunchRequest {
        LaunchRequest {
            epic_id: "epic-1".into(),
            settings: Some(ExecutionSettings {
                max_concurrent: max,
                ..ExecutionSettings::default()
            }),
        }
    }

    #[tokio::test]
    async fn launch_returns_wave_and_snapshot() {
        let (state, runtime) = create_test_state(FixedProvider::chain());
        let resp = launch_handler(State(state.clone()), Json(launch_req(2)))
            .await
            .unwrap()
            .0;
        assert!(resp.success);
        let data = resp.data.unwrap();
        assert_eq!(data.report.total, 3);
        assert_eq!(data.report.initial_wave.len(), 1);
        assert_eq!(data.snapshot.running_agents.len(), 1);
        assert_eq!(runtime.calls(), vec!["a"]);

        let stats = state.stats.read().await;
        assert_eq!(stats.requests_total(), 1);
    }

    #[tokio::test]
    async fn launch_rejects_blank_epic_id() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let req = LaunchRequest {
            epic_id: "  ".into(),
            settings: None,
        };
        let result = launch_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(HttpServerError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn provider_failure_counts_as_error() {
        let (state, _) = create_test_state(FixedProvider::unavailable());
        let result = launch_handler(State(state.clone()), Json(launch_req(1))).await;
        assert!(matches!(result, Err(HttpServerError::Scheduler(_))));
        assert_eq!(state.stats.read().await.route("/api/v1/epic/launch").errors, 1);
        assert!(!state.scheduler.is_active().await);
    }

    #[tokio::test]
    async fn complete_cascades_and_reports_spawn() {
        let (state, runtime) = create_test_state(FixedProvider::chain());
        launch_handler(State(state.clone()), Json(launch_req(1)))
            .await
            .unwrap();

        let resp = complete_handler(State(state.clone()), Path("a".to_string()))
            .await
            .unwrap()
            .0;
        let cascade = resp.data.unwrap().unwrap();
        assert_eq!(cascade.task_id, "b");
        assert!(cascade.success);
        assert_eq!(runtime.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn status_update_without_epic_conflicts() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let req = StatusRequest {
            status: ChildStatus::Completed,
            assignee: None,
        };
        let result = status_handler(State(state), Path("a".to_string()), Json(req)).await;
        assert!(matches!(
            result,
            Err(HttpServerError::Scheduler(
                epicflow_core::api::SchedulerError::NoActiveEpic
            ))
        ));
    }

    #[tokio::test]
    async fn spawn_next_is_null_without_capacity() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let resp = spawn_next_handler(State(state)).await.0;
        assert!(resp.success);
        assert!(resp.data.unwrap().is_none());
    }

    #[tokio::test]
    async fn review_uses_default_threshold_without_epic() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let resp = review_handler(State(state), Query(ReviewQuery { priority: 3 })).await.0;
        assert!(!resp.data.unwrap().requires_review);
    }

    #[tokio::test]
    async fn shutdown_signals_server() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let mut rx = state.shutdown_tx.subscribe();
        let resp = shutdown_handler(State(state)).await.0;
        assert!(resp.success);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn router_maps_unknown_task_to_404() {
        let (state, _) = create_test_state(FixedProvider::chain());
        state
            .scheduler
            .launch("epic-1", Some(ExecutionSettings::default()))
            .await
            .unwrap();

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/tasks/zzz/complete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorCode"], "unknown_task");
    }

    #[tokio::test]
    async fn router_serves_health() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let response = create_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["session_id"], "test-session");
        assert!(json["active_epic"].is_null());
    }

    #[tokio::test]
    async fn health_counts_epic_traffic() {
        let (state, _) = create_test_state(FixedProvider::chain());
        let app = create_router(state.clone());

        let launched = app
            .clone()
            .oneshot(
                Request::post("/api/v1/epic/launch")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"epicId":"epic-1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(launched.status(), StatusCode::OK);

        let rejected = app
            .clone()
            .oneshot(
                Request::post("/api/v1/tasks/zzz/complete")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["requests_handled"], 2);
        assert_eq!(json["requests_failed"], 1);
        assert_eq!(json["active_epic"], "epic-1");

        let stats = state.stats.read().await;
        assert_eq!(stats.route("/api/v1/epic/launch").requests, 1);
        assert_eq!(stats.route("/api/v1/tasks/complete").errors, 1);
    }
}
