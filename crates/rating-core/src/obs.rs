//! Structured lifecycle events for sessions and evaluations.
//!
//! Each event carries an `event` field (`session.created`,
//! `evaluation.recorded`, ...) so JSON log pipelines can filter on it.

use tracing::{info, warn};

/// Span tagging everything logged while handling one session.
///
/// Attach with `tracing::Instrument::instrument` so it stays valid across
/// `.await` points.
pub fn session_span(session_id: &str) -> tracing::Span {
    tracing::info_span!("rating.session", session_id = %session_id)
}

pub fn emit_session_created(session_id: &str, presenter: &str, criteria: usize) {
    info!(
        event = "session.created",
        session_id = %session_id,
        presenter = %presenter,
        criteria = criteria,
    );
}

/// `overall_score` is the server-computed value that was stored.
pub fn emit_evaluation_recorded(
    session_id: &str,
    evaluation_id: &str,
    overall_score: f64,
    evaluation_count: usize,
) {
    info!(
        event = "evaluation.recorded",
        session_id = %session_id,
        evaluation_id = %evaluation_id,
        overall_score = overall_score,
        evaluation_count = evaluation_count,
    );
}

pub fn emit_session_deleted(session_id: &str) {
    info!(event = "session.deleted", session_id = %session_id);
}

/// A client sent an `overallScore` that disagrees with the server's.
pub fn emit_score_mismatch(session_id: &str, client: f64, server: f64) {
    warn!(
        event = "evaluation.score_mismatch",
        session_id = %session_id,
        client_score = client,
        server_score = server,
    );
}

pub fn emit_persistence_error(operation: &str, error: &dyn std::fmt::Display) {
    warn!(event = "store.error", operation = %operation, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_span_is_named_and_carries_the_id() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let span = session_span("session_abc_123456");
            assert!(!span.is_disabled());

            let metadata = span.metadata().expect("enabled span has metadata");
            assert_eq!(metadata.name(), "rating.session");
            assert!(metadata.fields().field("session_id").is_some());
        });
    }
}
