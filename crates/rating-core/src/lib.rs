//! Rating Core Library
//!
//! Aggregation, criteria rules and the `RatingService` that the HTTP server
//! drives. Storage lives in `rating-state`.

pub mod aggregation;
pub mod criteria;
pub mod error;
pub mod obs;
pub mod service;
pub mod telemetry;

pub use aggregation::{
    average_overall, criterion_averages, overall_score, preview_overall_score,
    round_for_display, CriterionAverage, SessionSummary,
};
pub use criteria::{default_criteria, normalize_criteria, validate_ratings};
pub use error::{RatingError, Result, ValidationError};
pub use service::{
    CreateSessionRequest, RatingService, SubmitEvaluationRequest, DEFAULT_CREATED_BY,
    DEFAULT_EVALUATOR, SCORE_TOLERANCE,
};
pub use telemetry::{init_tracing, level_for};

pub use rating_state::{Criterion, Evaluation, Ratings, Score, Session, SessionStore};
