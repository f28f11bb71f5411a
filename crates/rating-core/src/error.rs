//! Error taxonomy for the rating service.

use rating_state::StorageError;

/// Request payload problems. Surfaced to HTTP clients as 400.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("presenter is required")]
    BlankPresenter,

    #[error("sessionId is required")]
    BlankSessionId,

    #[error("criterion id must not be empty")]
    EmptyCriterionId,

    #[error("duplicate criterion id: {id}")]
    DuplicateCriterion { id: String },

    #[error("criterion {id} has invalid weight {weight}; weights must be positive")]
    InvalidWeight { id: String, weight: f64 },

    #[error("criteria weights are too large; their weighted total must stay finite")]
    WeightTotalTooLarge,

    #[error("overall score is not a finite number")]
    NonFiniteScore,

    #[error("missing rating for criterion: {id}")]
    MissingRating { id: String },

    #[error("rating for unknown criterion: {id}")]
    UnknownCriterion { id: String },

    #[error("rating for {id} is {score}; scores must be between {min} and {max}")]
    ScoreOutOfRange { id: String, score: u8, min: u8, max: u8 },

    #[error("invalid request body: {0}")]
    MalformedBody(String),
}

/// Rating service errors.
#[derive(Debug, thiserror::Error)]
pub enum RatingError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("session not found: {0}")]
    NotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("store configuration error: {0}")]
    Configuration(String),
}

impl From<StorageError> for RatingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Configuration(msg) => RatingError::Configuration(msg),
            other => RatingError::Persistence(other.to_string()),
        }
    }
}

/// Result type for rating service operations.
pub type Result<T> = std::result::Result<T, RatingError>;
