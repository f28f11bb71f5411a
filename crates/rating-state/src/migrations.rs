//! Schema initialization for the persistent backends
//!
//! Every statement is guarded with `IF NOT EXISTS`, so running the
//! initialization again (another process, a restarted store) is a no-op.

use rusqlite::Connection;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

use crate::error::StorageError;
use crate::storage_traits::StorageResult;

/// Relational schema.
///
/// ```text
/// TABLE sessions {
///   id          TEXT PRIMARY KEY
///   presenter   TEXT
///   created_by  TEXT
///   criteria    TEXT (JSON array of criteria)
///   created_at  TEXT (RFC 3339, microseconds, UTC)
/// }
///
/// TABLE evaluations {
///   id             TEXT PRIMARY KEY
///   session_id     TEXT -> sessions.id ON DELETE CASCADE
///   evaluator      TEXT
///   ratings        TEXT (JSON object criterion id -> score)
///   overall_score  REAL
///   created_at     TEXT
/// }
/// ```
pub const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id          TEXT PRIMARY KEY,
        presenter   TEXT NOT NULL,
        created_by  TEXT NOT NULL,
        criteria    TEXT NOT NULL,
        created_at  TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON sessions (created_at DESC);

    CREATE TABLE IF NOT EXISTS evaluations (
        id             TEXT PRIMARY KEY,
        session_id     TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        evaluator      TEXT NOT NULL,
        ratings        TEXT NOT NULL,
        overall_score  REAL NOT NULL,
        created_at     TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_evaluations_session ON evaluations (session_id, created_at);
"#;

/// Connection-level settings. Foreign keys are off by default in SQLite and
/// the cascade on `evaluations.session_id` depends on them.
pub const SQLITE_PRAGMAS: &str = r#"
    PRAGMA foreign_keys = ON;
    PRAGMA busy_timeout = 5000;
"#;

/// Create the relational tables on an open connection.
pub fn init_sqlite_schema(conn: &Connection) -> StorageResult<()> {
    debug!("Initializing sqlite session schema");
    conn.execute_batch(SQLITE_SCHEMA)
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;
    info!("✓ sqlite sessions/evaluations tables initialized");
    Ok(())
}

/// Initialize the document-store tables in SurrealDB.
///
/// Schema:
/// ```text
/// TABLE session_docs {
///   session_key:  STRING (unique)
///   presenter:    STRING
///   created_by:   STRING
///   created_at:   DATETIME
///   criteria:     ARRAY<OBJECT>
///   evaluations:  ARRAY<OBJECT> (appended in place)
/// }
///
/// TABLE session_index {
///   session_key:  STRING (unique)
///   created_at:   DATETIME (ordered listing)
///   seq:          INT (insertion order, breaks created_at ties)
/// }
///
/// TABLE session_counter {
///   last_seq:     INT (one record, session_counter:sessions)
/// }
/// ```
pub async fn init_surreal_schema(db: &Surreal<Any>) -> StorageResult<()> {
    debug!("Initializing session_docs table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS session_docs SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_session_key ON TABLE session_docs COLUMNS session_key UNIQUE;

        DEFINE TABLE IF NOT EXISTS session_index SCHEMALESS;
        DEFINE INDEX IF NOT EXISTS idx_index_session_key ON TABLE session_index COLUMNS session_key UNIQUE;
        DEFINE INDEX IF NOT EXISTS idx_index_order ON TABLE session_index COLUMNS created_at, seq;

        DEFINE TABLE IF NOT EXISTS session_counter SCHEMALESS;
    "#;

    db.query(sql)
        .await
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?
        .check()
        .map_err(|e| StorageError::SchemaSetup(e.to_string()))?;

    info!("✓ session_docs and session_index tables initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SQLITE_PRAGMAS).unwrap();
        init_sqlite_schema(&conn).unwrap();
        init_sqlite_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(tables, vec!["evaluations".to_string(), "sessions".to_string()]);
    }

    #[tokio::test]
    async fn surreal_schema_is_idempotent() {
        let db = surrealdb::engine::any::connect("mem://").await.unwrap();
        db.use_ns("rating").use_db("test").await.unwrap();

        init_surreal_schema(&db).await.unwrap();
        init_surreal_schema(&db).await.unwrap();
    }
}
