//! Storage trait definitions for classroom rating
//!
//! `SessionStore` is the one persistence seam of the service. A session is
//! stored as an aggregate: the session header, its criteria, and the
//! evaluations appended to it.
//!
//! The trait is async and backend-agnostic. Implementations live in
//! `memory`, `sqlite_store` and `surreal_store`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::ids::{generate_id, EVALUATION_ID_PREFIX, SESSION_ID_PREFIX};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A single 1–5 rating.
pub type Score = u8;

/// Lowest score an evaluator can give.
pub const SCORE_MIN: Score = 1;

/// Highest score an evaluator can give.
pub const SCORE_MAX: Score = 5;

/// Ratings keyed by criterion id.
pub type Ratings = BTreeMap<String, Score>;

fn default_weight() -> f64 {
    1.0
}

/// A named, weighted dimension being rated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl Criterion {
    pub fn new(id: impl Into<String>, label: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            weight,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// One submitted rating by one evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub evaluator: String,
    pub ratings: Ratings,
    /// Weighted mean of `ratings`, frozen at submission time.
    pub overall_score: f64,
    pub created_at: DateTime<Utc>,
}

impl Evaluation {
    /// Build a new evaluation with a fresh id and the current timestamp.
    pub fn new(evaluator: &str, ratings: Ratings, overall_score: f64) -> Self {
        Self {
            id: generate_id(EVALUATION_ID_PREFIX),
            evaluator: evaluator.trim().to_string(),
            ratings,
            overall_score,
            created_at: now(),
        }
    }
}

/// One presenter's rating campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub presenter: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub criteria: Vec<Criterion>,
    pub evaluations: Vec<Evaluation>,
}

impl Session {
    /// Build a new, empty session with a fresh id.
    ///
    /// Presenter and creator names are trimmed.
    pub fn new(presenter: &str, created_by: &str, criteria: Vec<Criterion>) -> Self {
        Self {
            id: generate_id(SESSION_ID_PREFIX),
            presenter: presenter.trim().to_string(),
            created_by: created_by.trim().to_string(),
            created_at: now(),
            criteria,
            evaluations: Vec::new(),
        }
    }

    /// Look up a criterion by id.
    pub fn criterion(&self, id: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }
}

/// Current time truncated to microseconds, the finest precision every
/// backend round-trips.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Rating session store.
///
/// Guarantees:
/// - `list_sessions` returns sessions newest-created first.
/// - A missing session is `Ok(None)` / `Ok(false)`, never an error.
/// - Evaluations are appended in submission order and never rewritten.
/// - Deleting a session removes its evaluations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Short backend name for logs and health reporting.
    fn backend_name(&self) -> &'static str;

    /// Create tables/indexes if needed. Idempotent; every other operation
    /// calls it implicitly.
    async fn ensure_ready(&self) -> StorageResult<()>;

    /// All sessions, newest first.
    async fn list_sessions(&self) -> StorageResult<Vec<Session>>;

    /// Fetch one session with its evaluations.
    async fn get_session(&self, id: &str) -> StorageResult<Option<Session>>;

    /// Persist a new session and return it.
    async fn create_session(
        &self,
        presenter: &str,
        created_by: &str,
        criteria: Vec<Criterion>,
    ) -> StorageResult<Session>;

    /// Append an evaluation. Returns `None` if the session does not exist.
    async fn add_evaluation_to_session(
        &self,
        session_id: &str,
        evaluator: &str,
        ratings: Ratings,
        overall_score: f64,
    ) -> StorageResult<Option<Session>>;

    /// Remove a session and its evaluations. Returns whether it existed.
    async fn delete_session(&self, id: &str) -> StorageResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn criterion_weight_defaults_to_one() {
        let c: Criterion = serde_json::from_str(r#"{"id":"clarity","label":"Clarity"}"#).unwrap();
        assert_eq!(c.weight, 1.0);
        assert_eq!(c.description, "");
    }

    #[test]
    fn session_serializes_camel_case() {
        let session = Session::new("  Alice ", " Teacher ", vec![Criterion::new("a", "A", 1.0)]);
        assert_eq!(session.presenter, "Alice");
        assert_eq!(session.created_by, "Teacher");

        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("createdBy").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["evaluations"], serde_json::json!([]));
    }

    #[test]
    fn evaluation_serializes_overall_score() {
        let mut ratings = Ratings::new();
        ratings.insert("a".to_string(), 4);
        let eval = Evaluation::new(" Bob ", ratings, 4.0);
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["overallScore"], 4.0);
        assert_eq!(json["evaluator"], "Bob");
        assert!(eval.id.starts_with("eval_"));
    }

    #[test]
    fn criterion_lookup() {
        let session = Session::new(
            "Alice",
            "Teacher",
            vec![Criterion::new("a", "A", 1.0), Criterion::new("b", "B", 2.0)],
        );
        assert_eq!(session.criterion("b").map(|c| c.weight), Some(2.0));
        assert!(session.criterion("z").is_none());
    }
}
