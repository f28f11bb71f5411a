//! In-process session store
//!
//! `MemorySessionStore` keeps every aggregate in a `HashMap` owned by the
//! store instance. Nothing survives a restart; it is the fallback when no
//! external backend is configured, and the store most tests run against.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::storage_traits::*;

#[derive(Debug)]
struct Entry {
    /// Insertion order, breaks ties between equal `created_at` values.
    seq: u64,
    session: Session,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    sessions: HashMap<String, Entry>,
}

/// In-memory session store backed by a `HashMap<session id, Session>`.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: RwLock<Inner>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ensure_ready(&self) -> StorageResult<()> {
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        let inner = self.inner.read();
        let mut entries: Vec<&Entry> = inner.sessions.values().collect();
        entries.sort_by(|a, b| {
            b.session
                .created_at
                .cmp(&a.session.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        Ok(entries.into_iter().map(|e| e.session.clone()).collect())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, id: &str) -> StorageResult<Option<Session>> {
        let inner = self.inner.read();
        Ok(inner.sessions.get(id).map(|e| e.session.clone()))
    }

    #[instrument(skip(self, criteria), fields(criteria = criteria.len()))]
    async fn create_session(
        &self,
        presenter: &str,
        created_by: &str,
        criteria: Vec<Criterion>,
    ) -> StorageResult<Session> {
        let session = Session::new(presenter, created_by, criteria);

        let mut inner = self.inner.write();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.sessions.insert(
            session.id.clone(),
            Entry {
                seq,
                session: session.clone(),
            },
        );

        debug!(session_id = %session.id, "session stored in memory");
        Ok(session)
    }

    #[instrument(skip(self, ratings))]
    async fn add_evaluation_to_session(
        &self,
        session_id: &str,
        evaluator: &str,
        ratings: Ratings,
        overall_score: f64,
    ) -> StorageResult<Option<Session>> {
        let mut inner = self.inner.write();
        let Some(entry) = inner.sessions.get_mut(session_id) else {
            return Ok(None);
        };

        entry
            .session
            .evaluations
            .push(Evaluation::new(evaluator, ratings, overall_score));
        Ok(Some(entry.session.clone()))
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, id: &str) -> StorageResult<bool> {
        let mut inner = self.inner.write();
        Ok(inner.sessions.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> Vec<Criterion> {
        vec![Criterion::new("clarity", "Clarity", 1.0)]
    }

    #[tokio::test]
    async fn stores_are_isolated() {
        let a = MemorySessionStore::new();
        let b = MemorySessionStore::new();

        a.create_session("Alice", "Teacher", criteria()).await.unwrap();

        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[tokio::test]
    async fn list_breaks_timestamp_ties_by_insertion() {
        let store = MemorySessionStore::new();
        let first = store.create_session("First", "T", criteria()).await.unwrap();
        let second = store.create_session("Second", "T", criteria()).await.unwrap();

        // Force equal timestamps.
        {
            let mut inner = store.inner.write();
            let ts = first.created_at;
            if let Some(e) = inner.sessions.get_mut(&second.id) {
                e.session.created_at = ts;
            }
        }

        let listed = store.list_sessions().await.unwrap();
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }
}
