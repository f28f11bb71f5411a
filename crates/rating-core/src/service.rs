//! `RatingService`: request handling on top of a `SessionStore`.
//!
//! The HTTP layer stays thin. Defaults, validation, server-side scoring and
//! the mapping of store results into [`RatingError`] all happen here.

use std::sync::Arc;

use rating_state::{Criterion, Ratings, Session, SessionStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, Instrument};

use crate::aggregation::{overall_score, SessionSummary};
use crate::criteria::{normalize_criteria, validate_ratings};
use crate::error::{RatingError, Result, ValidationError};
use crate::obs;

/// `createdBy` used when the creator leaves it blank.
pub const DEFAULT_CREATED_BY: &str = "Teacher";

/// `evaluator` used when the rater leaves it blank.
pub const DEFAULT_EVALUATOR: &str = "Anonymous";

/// Client and server overall scores may differ by this much before a warning.
pub const SCORE_TOLERANCE: f64 = 0.01;

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub presenter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Vec<Criterion>>,
}

/// Body of `POST /evaluations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEvaluationRequest {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<String>,
    #[serde(default)]
    pub ratings: Ratings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
}

fn or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Rating operations over an injected store.
#[derive(Clone)]
pub struct RatingService {
    store: Arc<dyn SessionStore>,
}

impl RatingService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Run the backend's schema setup now instead of on first use.
    pub async fn ensure_ready(&self) -> Result<()> {
        self.store.ensure_ready().await?;
        Ok(())
    }

    /// All sessions, newest first.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.store.list_sessions().await.map_err(|e| {
            obs::emit_persistence_error("list_sessions", &e);
            RatingError::from(e)
        })
    }

    pub async fn get_session(&self, id: &str) -> Result<Session> {
        self.store
            .get_session(id)
            .await?
            .ok_or_else(|| RatingError::NotFound(id.to_string()))
    }

    pub async fn session_summary(&self, id: &str) -> Result<SessionSummary> {
        let session = self.get_session(id).await?;
        Ok(SessionSummary::from_session(&session))
    }

    #[instrument(skip(self, request), fields(presenter = %request.presenter.trim()))]
    pub async fn create_session(&self, request: CreateSessionRequest) -> Result<Session> {
        let presenter = request.presenter.trim();
        if presenter.is_empty() {
            return Err(ValidationError::BlankPresenter.into());
        }
        let created_by = or_default(request.created_by.as_deref(), DEFAULT_CREATED_BY);
        let criteria = normalize_criteria(request.criteria.unwrap_or_default())?;

        let session = self
            .store
            .create_session(presenter, &created_by, criteria)
            .await
            .map_err(|e| {
                obs::emit_persistence_error("create_session", &e);
                RatingError::from(e)
            })?;

        obs::emit_session_created(&session.id, &session.presenter, session.criteria.len());
        Ok(session)
    }

    /// Validate, score and append one evaluation. Returns the updated session.
    pub async fn submit_evaluation(&self, request: SubmitEvaluationRequest) -> Result<Session> {
        let session_id = request.session_id.trim().to_string();
        if session_id.is_empty() {
            return Err(ValidationError::BlankSessionId.into());
        }

        let span = obs::session_span(&session_id);
        self.submit_evaluation_inner(session_id, request)
            .instrument(span)
            .await
    }

    async fn submit_evaluation_inner(
        &self,
        session_id: String,
        request: SubmitEvaluationRequest,
    ) -> Result<Session> {
        let session = self.get_session(&session_id).await?;

        validate_ratings(&session.criteria, &request.ratings)?;
        let score = overall_score(&session.criteria, &request.ratings)?;

        if let Some(client) = request.overall_score {
            if !client.is_finite() || (client - score).abs() > SCORE_TOLERANCE {
                obs::emit_score_mismatch(&session_id, client, score);
            }
        }

        let evaluator = or_default(request.evaluator.as_deref(), DEFAULT_EVALUATOR);
        debug!(evaluator = %evaluator, overall_score = score, "appending evaluation");

        let updated = self
            .store
            .add_evaluation_to_session(&session_id, &evaluator, request.ratings, score)
            .await
            .map_err(|e| {
                obs::emit_persistence_error("add_evaluation_to_session", &e);
                RatingError::from(e)
            })?
            .ok_or_else(|| RatingError::NotFound(session_id.clone()))?;

        if let Some(recorded) = updated.evaluations.last() {
            obs::emit_evaluation_recorded(
                &session_id,
                &recorded.id,
                recorded.overall_score,
                updated.evaluations.len(),
            );
        }
        Ok(updated)
    }

    pub async fn delete_session(&self, id: &str) -> Result<()> {
        let deleted = self.store.delete_session(id).await.map_err(|e| {
            obs::emit_persistence_error("delete_session", &e);
            RatingError::from(e)
        })?;

        if !deleted {
            return Err(RatingError::NotFound(id.to_string()));
        }
        obs::emit_session_deleted(id);
        Ok(())
    }
}
