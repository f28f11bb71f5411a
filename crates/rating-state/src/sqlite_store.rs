//! SQLite-backed SessionStore implementation
//!
//! Relational layout: one row per session, one row per evaluation with a
//! cascading foreign key. Criteria and ratings are JSON text columns.
//!
//! `rusqlite` is blocking, so each operation takes the connection lock on
//! the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::StorageError;
use crate::migrations;
use crate::storage_traits::*;

/// SQLite-backed implementation of [`SessionStore`].
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    ready: OnceCell<()>,
}

impl SqliteSessionStore {
    /// Open or create a database file. Tables are created on first use.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Connection(format!(
                        "failed to create database directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| StorageError::Connection(format!("{}: {e}", path.display())))?;
        Self::from_connection(conn, path.to_owned())
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Connection(e.to_string()))?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(conn: Connection, path: PathBuf) -> StorageResult<Self> {
        conn.execute_batch(migrations::SQLITE_PRAGMAS)
            .map_err(|e| StorageError::Connection(format!("pragmas: {e}")))?;

        info!(path = %path.display(), "SqliteSessionStore opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            ready: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // -- private helpers -----------------------------------------------------

    /// Run a closure against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_ready().await?;
        self.run_blocking(f).await
    }

    async fn run_blocking<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("sqlite task failed: {e}")))?
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp {raw:?}: {e}")))
}

struct SessionRow {
    id: String,
    presenter: String,
    created_by: String,
    criteria: String,
    created_at: String,
}

struct EvaluationRow {
    id: String,
    evaluator: String,
    ratings: String,
    overall_score: f64,
    created_at: String,
}

impl EvaluationRow {
    fn into_evaluation(self) -> StorageResult<Evaluation> {
        Ok(Evaluation {
            id: self.id,
            evaluator: self.evaluator,
            ratings: serde_json::from_str(&self.ratings)?,
            overall_score: self.overall_score,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

/// Load a session and its evaluations (oldest first).
fn load_session(conn: &Connection, id: &str) -> StorageResult<Option<Session>> {
    let row = conn
        .query_row(
            "SELECT id, presenter, created_by, criteria, created_at
             FROM sessions WHERE id = ?1 LIMIT 1",
            [id],
            |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    presenter: row.get(1)?,
                    created_by: row.get(2)?,
                    criteria: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT id, evaluator, ratings, overall_score, created_at
         FROM evaluations WHERE session_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let evaluations = stmt
        .query_map([id], |r| {
            Ok(EvaluationRow {
                id: r.get(0)?,
                evaluator: r.get(1)?,
                ratings: r.get(2)?,
                overall_score: r.get(3)?,
                created_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(EvaluationRow::into_evaluation)
        .collect::<StorageResult<Vec<_>>>()?;

    Ok(Some(Session {
        id: row.id,
        presenter: row.presenter,
        created_by: row.created_by,
        created_at: parse_ts(&row.created_at)?,
        criteria: serde_json::from_str(&row.criteria)?,
        evaluations,
    }))
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_ready(&self) -> StorageResult<()> {
        self.ready
            .get_or_try_init(|| async {
                self.run_blocking(|conn| migrations::init_sqlite_schema(conn))
                    .await
            })
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM sessions ORDER BY created_at DESC, rowid DESC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            let mut sessions = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(session) = load_session(conn, &id)? {
                    sessions.push(session);
                }
            }
            Ok(sessions)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_session(&self, id: &str) -> StorageResult<Option<Session>> {
        let id = id.to_string();
        self.with_conn(move |conn| load_session(conn, &id)).await
    }

    #[instrument(skip(self, criteria), fields(criteria = criteria.len()))]
    async fn create_session(
        &self,
        presenter: &str,
        created_by: &str,
        criteria: Vec<Criterion>,
    ) -> StorageResult<Session> {
        let session = Session::new(presenter, created_by, criteria);
        let criteria_json = serde_json::to_string(&session.criteria)?;

        let row = session.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, presenter, created_by, criteria, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.presenter,
                    row.created_by,
                    criteria_json,
                    format_ts(&row.created_at),
                ],
            )?;
            Ok(())
        })
        .await?;

        debug!(session_id = %session.id, "session row inserted");
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
        let session_id = session_id.to_string();
        let evaluation = Evaluation::new(evaluator, ratings, overall_score);
        let ratings_json = serde_json::to_string(&evaluation.ratings)?;

        self.with_conn(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sessions WHERE id = ?1",
                    [&session_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            conn.execute(
                "INSERT INTO evaluations (id, session_id, evaluator, ratings, overall_score, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    evaluation.id,
                    session_id,
                    evaluation.evaluator,
                    ratings_json,
                    evaluation.overall_score,
                    format_ts(&evaluation.created_at),
                ],
            )?;

            load_session(conn, &session_id)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, id: &str) -> StorageResult<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM sessions WHERE id = ?1", [&id])?;
            Ok(removed > 0)
        })
        .await
    }
}
