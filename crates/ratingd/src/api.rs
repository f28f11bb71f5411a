//! HTTP routes over [`RatingService`].
//!
//! Handlers translate between JSON and service calls. Errors become plain
//! text bodies with a status derived from [`RatingError`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rating_core::{
    CreateSessionRequest, RatingError, RatingService, Session, SessionSummary,
    SubmitEvaluationRequest, ValidationError,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: RatingService,
}

impl AppState {
    pub fn new(service: RatingService) -> Self {
        Self { service }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/summary", get(session_summary))
        .route("/evaluations", post(submit_evaluation))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Error returned by handlers.
#[derive(Debug)]
pub struct ApiError(RatingError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RatingError::Validation(_) => StatusCode::BAD_REQUEST,
            RatingError::NotFound(_) => StatusCode::NOT_FOUND,
            RatingError::Persistence(_) | RatingError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RatingError> for ApiError {
    fn from(err: RatingError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ValidationError::MalformedBody(rejection.body_text()).into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, self.0.to_string()).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "backend": state.service.backend_name(),
    }))
}

async fn list_sessions(State(state): State<AppState>) -> ApiResult<Json<Vec<Session>>> {
    Ok(Json(state.service.list_sessions().await?))
}

async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let Json(request) = payload?;
    let session = state.service.create_session(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Session>> {
    Ok(Json(state.service.get_session(&id).await?))
}

async fn session_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    Ok(Json(state.service.session_summary(&id).await?))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_session(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_evaluation(
    State(state): State<AppState>,
    payload: Result<Json<SubmitEvaluationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let Json(request) = payload?;
    let session = state.service.submit_evaluation(request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rating_state::MemorySessionStore;

    #[test]
    fn build_router_creates_routes() {
        let service = RatingService::new(Arc::new(MemorySessionStore::new()));
        let _router = build_router(AppState::new(service));
    }

    #[test]
    fn error_status_mapping() {
        let cases = [
            (
                RatingError::Validation(ValidationError::BlankPresenter),
                StatusCode::BAD_REQUEST,
            ),
            (RatingError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                RatingError::Persistence("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RatingError::Configuration("bad".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status(), expected);
        }
    }
}
