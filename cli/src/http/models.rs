use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use epicflow_core::api::{ChildStatus, EpicSnapshot, ExecutionSettings, LaunchReport, SchedulerError};
use serde::{Deserialize, Serialize};

// ============= Envelope =============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            error_code: None,
        }
    }
}

// ============= Epic =============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub epic_id: String,
    #[serde(default)]
    pub settings: Option<ExecutionSettings>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchData {
    pub report: LaunchReport,
    pub snapshot: EpicSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub settings: ExecutionSettings,
}

// ============= Tasks =============

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ChildStatus,
    #[serde(default)]
    pub assignee: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub priority: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewData {
    pub priority: i64,
    pub requires_review: bool,
}

// ============= Health =============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_id: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub requests_failed: u64,
    pub active_epic: Option<String>,
    pub timestamp: String,
}

// ============= Error Handling =============

#[derive(Debug)]
pub enum HttpServerError {
    InvalidRequest(String),
    Scheduler(SchedulerError),
    Internal(String),
}

impl From<SchedulerError> for HttpServerError {
    fn from(e: SchedulerError) -> Self {
        Self::Scheduler(e)
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg),
            Self::Scheduler(e) => {
                let status = match &e {
                    SchedulerError::ProviderFetch { .. } => StatusCode::BAD_GATEWAY,
                    SchedulerError::NoActiveEpic => StatusCode::CONFLICT,
                    SchedulerError::UnknownTask(_) => StatusCode::NOT_FOUND,
                    SchedulerError::InvalidSettings(_) => StatusCode::BAD_REQUEST,
                };
                (status, e.error_code(), e.to_string())
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            error_code: Some(error_code.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_request_settings_optional() {
        let req: LaunchRequest = serde_json::from_str(r#"{"epicId":"e1"}"#).unwrap();
        assert_eq!(req.epic_id, "e1");
        assert!(req.settings.is_none());

        let req: LaunchRequest = serde_json::from_str(
            r#"{"epicId":"e1","settings":{"maxConcurrent":2,"reviewThreshold":"p0"}}"#,
        )
        .unwrap();
        let settings = req.settings.unwrap();
        assert_eq!(settings.max_concurrent, 2);
        assert!(settings.auto_spawn);
    }

    #[test]
    fn status_request_uses_snake_case_status() {
        let req: StatusRequest =
            serde_json::from_str(r#"{"status":"in_progress","assignee":"kim"}"#).unwrap();
        assert_eq!(req.status, ChildStatus::InProgress);
        assert_eq!(req.assignee.as_deref(), Some("kim"));
    }

    #[test]
    fn envelope_omits_empty_fields() {
        let json = serde_json::to_string(&ApiResponse::ok(serde_json::json!({"n": 1}))).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"n\":1"));
        assert!(!json.contains("errorCode"));
    }

    #[test]
    fn scheduler_errors_map_to_status() {
        let resp = HttpServerError::from(SchedulerError::UnknownTask("x".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = HttpServerError::from(SchedulerError::NoActiveEpic).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }
}
