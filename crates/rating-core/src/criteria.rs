//! Default criteria and criteria validation.

use std::collections::HashSet;

use rating_state::{Criterion, Ratings, SCORE_MAX, SCORE_MIN};

use crate::error::ValidationError;

/// The six criteria a session gets when the creator does not supply any.
pub fn default_criteria() -> Vec<Criterion> {
    vec![
        Criterion::new("explainability", "Explainability", 1.0)
            .with_description("How well concepts were broken down and explained."),
        Criterion::new("clarity", "Clarity", 1.0)
            .with_description("How clear and easy to follow the presentation was."),
        Criterion::new("content", "Content Quality", 1.0)
            .with_description("Depth, accuracy, and organization of the content."),
        Criterion::new("engagement", "Engagement", 1.0)
            .with_description("How well the presenter kept the audience engaged."),
        Criterion::new("timeManagement", "Time Management", 1.0)
            .with_description("Pacing and use of the allotted time."),
        Criterion::new("delivery", "Delivery", 1.0)
            .with_description("Voice, body language, and overall delivery."),
    ]
}

/// Check and tidy a creator-supplied criteria list.
///
/// An empty list means "use the defaults". Ids and labels are trimmed, a
/// blank label falls back to the id. The weights must also sum to a total
/// that stays finite once multiplied by the top score.
pub fn normalize_criteria(criteria: Vec<Criterion>) -> Result<Vec<Criterion>, ValidationError> {
    if criteria.is_empty() {
        return Ok(default_criteria());
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(criteria.len());
    let mut total_weight = 0.0;

    for mut c in criteria {
        c.id = c.id.trim().to_string();
        if c.id.is_empty() {
            return Err(ValidationError::EmptyCriterionId);
        }
        if !seen.insert(c.id.clone()) {
            return Err(ValidationError::DuplicateCriterion { id: c.id });
        }
        if !c.weight.is_finite() || c.weight <= 0.0 {
            return Err(ValidationError::InvalidWeight {
                id: c.id,
                weight: c.weight,
            });
        }

        total_weight += c.weight;

        c.label = c.label.trim().to_string();
        if c.label.is_empty() {
            c.label = c.id.clone();
        }
        c.description = c.description.trim().to_string();
        normalized.push(c);
    }

    if !(total_weight * f64::from(SCORE_MAX)).is_finite() {
        return Err(ValidationError::WeightTotalTooLarge);
    }
    Ok(normalized)
}

/// Ratings must cover exactly `criteria`, each score within `[1,5]`.
pub fn validate_ratings(criteria: &[Criterion], ratings: &Ratings) -> Result<(), ValidationError> {
    for c in criteria {
        if !ratings.contains_key(&c.id) {
            return Err(ValidationError::MissingRating { id: c.id.clone() });
        }
    }

    for (id, score) in ratings {
        if !criteria.iter().any(|c| &c.id == id) {
            return Err(ValidationError::UnknownCriterion { id: id.clone() });
        }
        if !(SCORE_MIN..=SCORE_MAX).contains(score) {
            return Err(ValidationError::ScoreOutOfRange {
                id: id.clone(),
                score: *score,
                min: SCORE_MIN,
                max: SCORE_MAX,
            });
        }
    }

    Ok(())
}
