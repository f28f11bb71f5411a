//! Score aggregation.
//!
//! Everything here is pure. Stored `overallScore` values keep full precision;
//! [`round_for_display`] is applied only when a number is shown to a person.

use rating_state::{Criterion, Ratings, Session};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Weighted mean of `ratings` over `criteria`.
///
/// Every criterion must be rated. Ratings for ids outside `criteria` do not
/// contribute. An empty criteria list scores `0.0`. Weights large enough to
/// overflow the sums are rejected rather than producing `NaN`.
pub fn overall_score(criteria: &[Criterion], ratings: &Ratings) -> Result<f64, ValidationError> {
    let mut weighted = 0.0;
    let mut total_weight = 0.0;

    for c in criteria {
        let score = ratings
            .get(&c.id)
            .ok_or_else(|| ValidationError::MissingRating { id: c.id.clone() })?;
        weighted += f64::from(*score) * c.weight;
        total_weight += c.weight;
    }

    if !weighted.is_finite() || !total_weight.is_finite() {
        return Err(ValidationError::NonFiniteScore);
    }
    if total_weight <= 0.0 {
        return Ok(0.0);
    }
    let score = weighted / total_weight;
    if !score.is_finite() {
        return Err(ValidationError::NonFiniteScore);
    }
    Ok(score)
}

/// Live preview for a rating form. `None` until every criterion is rated.
pub fn preview_overall_score(criteria: &[Criterion], partial: &Ratings) -> Option<f64> {
    overall_score(criteria, partial).ok()
}

/// Class average for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionAverage {
    pub id: String,
    pub label: String,
    pub weight: f64,
    /// Unweighted mean of the ratings; `None` when nobody rated it yet.
    pub average: Option<f64>,
    pub rating_count: usize,
}

/// Plain arithmetic mean per criterion across all evaluations, in criteria order.
pub fn criterion_averages(session: &Session) -> Vec<CriterionAverage> {
    session
        .criteria
        .iter()
        .map(|c| {
            let scores: Vec<f64> = session
                .evaluations
                .iter()
                .filter_map(|e| e.ratings.get(&c.id))
                .map(|s| f64::from(*s))
                .collect();

            CriterionAverage {
                id: c.id.clone(),
                label: c.label.clone(),
                weight: c.weight,
                average: mean(&scores),
                rating_count: scores.len(),
            }
        })
        .collect()
}

/// Mean of the stored overall scores. `None` for a session with no evaluations.
pub fn average_overall(session: &Session) -> Option<f64> {
    let scores: Vec<f64> = session.evaluations.iter().map(|e| e.overall_score).collect();
    mean(&scores)
}

/// Read model served by `GET /sessions/{id}/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub presenter: String,
    pub evaluation_count: usize,
    pub average_overall: Option<f64>,
    pub criteria: Vec<CriterionAverage>,
}

impl SessionSummary {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            presenter: session.presenter.clone(),
            evaluation_count: session.evaluations.len(),
            average_overall: average_overall(session),
            criteria: criterion_averages(session),
        }
    }
}

/// Round to two decimals for display.
pub fn round_for_display(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
