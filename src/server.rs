//! HTTP surface over [`GoalService`].
//!
//! Identity comes from two request headers set by the upstream identity
//! provider: `x-user-id` (required) and `x-membership-tier` (optional,
//! defaults to `explorer`; backend plan names are accepted). Errors are
//! returned as `{ "kind", "code", "message" }` JSON with a status derived
//! from the error kind.
//!
//! Store and activity-log access is blocking file I/O, so every handler
//! runs its service call on the blocking thread pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analytics::GoalAnalytics;
use crate::consultation::BookingRequest;
use crate::error::{EngineError, ErrorKind};
use crate::model::{
    Caller, Goal, GoalDraft, GoalId, GoalView, MentorConsultation, MentorReview, Task, TaskId,
    UserId,
};
use crate::service::{GoalService, TaskUpdate};
use crate::tier::Tier;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Header carrying the caller's membership tier.
pub const TIER_HEADER: &str = "x-membership-tier";

type SharedService = Arc<GoalService>;

// ── Errors ────────────────────────────────────────────────────────────────

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

/// An [`EngineError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::PolicyViolation => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage | ErrorKind::Config | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        } else {
            tracing::debug!(code = self.0.code(), error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            kind,
            code: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run a blocking service call off the async runtime.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Other(anyhow::anyhow!("worker task failed: {e}")))?;
    Ok(Json(result?))
}

// ── Identity ──────────────────────────────────────────────────────────────

/// The caller resolved from identity headers.
#[derive(Debug, Clone)]
pub struct Identity(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let header = |name: &str| -> Option<String> {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let user_id = header(USER_HEADER)
            .ok_or_else(|| EngineError::validation(USER_HEADER, "header is required"))?;
        let tier = match header(TIER_HEADER) {
            Some(name) => Tier::from_backend(&name)
                .map_err(|e| EngineError::validation(TIER_HEADER, e.to_string()))?,
            None => Tier::default(),
        };

        Ok(Identity(Caller::new(UserId::from_string(user_id), tier)))
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn login(
    State(service): State<SharedService>,
    Identity(caller): Identity,
) -> StatusCode {
    if let Err(ApiError(e)) = blocking(move || {
        service.record_login(&caller.user_id, Utc::now());
        Ok(())
    })
    .await
    {
        tracing::warn!(error = %e, "failed to record login");
    }
    StatusCode::NO_CONTENT
}

async fn create_goal(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Json(draft): Json<GoalDraft>,
) -> Result<(StatusCode, Json<Goal>), ApiError> {
    let goal = blocking(move || service.create_goal(&caller.user_id, draft, Utc::now())).await?;
    Ok((StatusCode::CREATED, goal))
}

async fn list_goals(
    State(service): State<SharedService>,
    Identity(caller): Identity,
) -> ApiResult<Vec<Goal>> {
    blocking(move || service.list_goals(&caller.user_id)).await
}

async fn get_goal(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path(goal_id): Path<String>,
) -> ApiResult<GoalView> {
    let goal_id = GoalId::from_string(goal_id);
    blocking(move || service.goal_view(&goal_id, &caller)).await
}

async fn delete_goal(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path(goal_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let goal_id = GoalId::from_string(goal_id);
    blocking(move || service.delete_goal(&goal_id, &caller.user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn goal_analytics(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path(goal_id): Path<String>,
) -> ApiResult<GoalAnalytics> {
    let goal_id = GoalId::from_string(goal_id);
    blocking(move || service.analytics(&goal_id, &caller.user_id, Utc::now())).await
}

async fn toggle_task(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path((goal_id, task_id)): Path<(String, String)>,
) -> ApiResult<TaskUpdate> {
    let (goal_id, task_id) = (GoalId::from_string(goal_id), TaskId::from_string(task_id));
    blocking(move || service.toggle_task(&goal_id, &task_id, &caller, Utc::now())).await
}

#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    pub submission_url: String,
}

async fn submit_assignment(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path((goal_id, task_id)): Path<(String, String)>,
    Json(request): Json<SubmissionRequest>,
) -> ApiResult<Task> {
    let (goal_id, task_id) = (GoalId::from_string(goal_id), TaskId::from_string(task_id));
    blocking(move || {
        service.submit_assignment(
            &goal_id,
            &task_id,
            &caller,
            &request.submission_url,
            Utc::now(),
        )
    })
    .await
}

async fn record_review(
    State(service): State<SharedService>,
    Identity(reviewer): Identity,
    Path((goal_id, task_id)): Path<(String, String)>,
    Json(review): Json<MentorReview>,
) -> ApiResult<TaskUpdate> {
    let (goal_id, task_id) = (GoalId::from_string(goal_id), TaskId::from_string(task_id));
    blocking(move || service.record_review(&goal_id, &task_id, &reviewer, review, Utc::now())).await
}

async fn book_consultation(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path(goal_id): Path<String>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<MentorConsultation>), ApiError> {
    let goal_id = GoalId::from_string(goal_id);
    let booked =
        blocking(move || service.book_consultation(&goal_id, &caller, request, Utc::now())).await?;
    Ok((StatusCode::CREATED, booked))
}

async fn list_consultations(
    State(service): State<SharedService>,
    Identity(caller): Identity,
    Path(goal_id): Path<String>,
) -> ApiResult<Vec<MentorConsultation>> {
    let goal_id = GoalId::from_string(goal_id);
    blocking(move || service.consultations(&goal_id, &caller.user_id)).await
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router(service: GoalService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/goals", get(list_goals).post(create_goal))
        .route("/goals/{id}", get(get_goal).delete(delete_goal))
        .route("/goals/{id}/analytics", get(goal_analytics))
        .route("/goals/{id}/tasks/{task_id}/toggle", post(toggle_task))
        .route(
            "/goals/{id}/tasks/{task_id}/submission",
            post(submit_assignment),
        )
        .route("/goals/{id}/tasks/{task_id}/review", post(record_review))
        .route(
            "/goals/{id}/consultations",
            get(list_consultations).post(book_consultation),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(service))
}

/// Serve the router on `addr` until the process is stopped.
pub async fn serve(service: GoalService, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("goal-engine server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
