//! SurrealDB-backed SessionStore implementation
//!
//! Document layout: each session is a single document in `session_docs`
//! keyed by `session_key`, with its evaluations nested in an array. A
//! separate `session_index` table keeps `(session_key, created_at, seq)` for
//! newest-first listing. `seq` comes from a counter record bumped inside the
//! create transaction, so sessions sharing a timestamp still list in reverse
//! insertion order.
//!
//! Appending an evaluation is one `UPDATE ... SET evaluations += ...`
//! statement, so concurrent submissions to the same session do not
//! overwrite each other.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::sql::{Datetime as SurrealDatetime, Thing};
use surrealdb::Surreal;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::CloudConfig;
use crate::error::StorageError;
use crate::migrations;
use crate::storage_traits::*;

/// Namespace used when a URL connection does not name one.
pub const DEFAULT_NAMESPACE: &str = "rating";
/// Database used when a URL connection does not name one.
pub const DEFAULT_DATABASE: &str = "main";

const DOC_FIELDS: &str = "id, session_key, presenter, created_by, created_at, criteria, evaluations";

/// Document, index entry and counter bump commit or roll back together.
const CREATE_SESSION_TX: &str = r#"
    BEGIN TRANSACTION;
    LET $seq = (UPSERT session_counter:sessions SET last_seq = (last_seq OR 0) + 1 RETURN VALUE last_seq)[0];
    CREATE session_docs CONTENT $doc RETURN NONE;
    CREATE session_index SET session_key = $key, created_at = $created_at, seq = $seq RETURN NONE;
    COMMIT TRANSACTION;
"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbEvaluation {
    evaluation_id: String,
    evaluator: String,
    ratings: Ratings,
    overall_score: f64,
    created_at: SurrealDatetime,
}

impl From<Evaluation> for DbEvaluation {
    fn from(e: Evaluation) -> Self {
        Self {
            evaluation_id: e.id,
            evaluator: e.evaluator,
            ratings: e.ratings,
            overall_score: e.overall_score,
            created_at: SurrealDatetime::from(e.created_at),
        }
    }
}

impl DbEvaluation {
    fn into_evaluation(self) -> Evaluation {
        Evaluation {
            id: self.evaluation_id,
            evaluator: self.evaluator,
            ratings: self.ratings,
            overall_score: self.overall_score,
            created_at: DateTime::<Utc>::from(self.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DbSessionDoc {
    /// SurrealDB record ID
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    session_key: String,
    presenter: String,
    created_by: String,
    created_at: SurrealDatetime,
    criteria: Vec<Criterion>,
    evaluations: Vec<DbEvaluation>,
}

impl From<Session> for DbSessionDoc {
    fn from(s: Session) -> Self {
        Self {
            id: None,
            session_key: s.id,
            presenter: s.presenter,
            created_by: s.created_by,
            created_at: SurrealDatetime::from(s.created_at),
            criteria: s.criteria,
            evaluations: s.evaluations.into_iter().map(DbEvaluation::from).collect(),
        }
    }
}

impl DbSessionDoc {
    fn into_session(self) -> Session {
        Session {
            id: self.session_key,
            presenter: self.presenter,
            created_by: self.created_by,
            created_at: DateTime::<Utc>::from(self.created_at),
            criteria: self.criteria,
            evaluations: self
                .evaluations
                .into_iter()
                .map(DbEvaluation::into_evaluation)
                .collect(),
        }
    }
}

/// SurrealDB-backed implementation of [`SessionStore`].
pub struct SurrealSessionStore {
    db: Surreal<Any>,
    ready: OnceCell<()>,
}

impl SurrealSessionStore {
    /// Create an in-memory instance (`mem://`), mostly for tests.
    pub async fn in_memory() -> StorageResult<Self> {
        Self::connect("mem://", DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
    }

    /// Connect to a URL without signing in (`mem://`, `surrealkv://path`,
    /// `ws://host:port`).
    #[instrument(skip_all, fields(url = %url, namespace = %namespace, database = %database))]
    pub async fn connect(url: &str, namespace: &str, database: &str) -> StorageResult<Self> {
        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StorageError::Connection(format!("failed to connect to {url}: {e}")))?;

        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        info!("SurrealSessionStore connected ({})", url);
        Ok(Self::from_client(db))
    }

    /// Connect to a remote SurrealDB with root or database-user sign-in.
    #[instrument(
        skip(config),
        fields(
            endpoint = %config.endpoint,
            namespace = %config.namespace,
            database = %config.database
        )
    )]
    pub async fn connect_cloud(config: CloudConfig) -> StorageResult<Self> {
        info!("Connecting to SurrealDB (root={})", config.is_root);

        let db = surrealdb::engine::any::connect(&config.endpoint)
            .await
            .map_err(|e| {
                StorageError::Connection(format!("failed to connect to {}: {e}", config.endpoint))
            })?;

        if config.is_root {
            db.signin(Root {
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| StorageError::Connection(format!("root authentication failed: {e}")))?;
        } else {
            db.signin(Database {
                namespace: &config.namespace,
                database: &config.database,
                username: &config.username,
                password: &config.password,
            })
            .await
            .map_err(|e| {
                StorageError::Connection(format!("database authentication failed: {e}"))
            })?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await
            .map_err(|e| {
                StorageError::Connection(format!("failed to select namespace/database: {e}"))
            })?;

        info!("SurrealSessionStore connected (remote)");
        Ok(Self::from_client(db))
    }

    /// Wrap an already connected client. Tables are created on first use.
    pub fn from_client(db: Surreal<Any>) -> Self {
        Self {
            db,
            ready: OnceCell::new(),
        }
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_doc(&self, key: &str) -> StorageResult<Option<DbSessionDoc>> {
        let key_owned = key.to_string();
        let mut res = self
            .db
            .query(format!(
                "SELECT {DOC_FIELDS} FROM session_docs WHERE session_key = $key LIMIT 1"
            ))
            .bind(("key", key_owned))
            .await?;

        let docs: Vec<DbSessionDoc> = res.take(0)?;
        Ok(docs.into_iter().next())
    }
}

#[async_trait]
impl SessionStore for SurrealSessionStore {
    fn backend_name(&self) -> &'static str {
        "surrealdb"
    }

    async fn ensure_ready(&self) -> StorageResult<()> {
        self.ready
            .get_or_try_init(|| migrations::init_surreal_schema(&self.db))
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self) -> StorageResult<Vec<Session>> {
        self.ensure_ready().await?;

        let mut res = self
            .db
            .query(
                "SELECT session_key, created_at, seq FROM session_index \
                 ORDER BY created_at DESC, seq DESC",
            )
            .await?;

        #[derive(Deserialize)]
        struct IndexKey {
            session_key: String,
        }

        let keys: Vec<IndexKey> = res.take(0)?;
        let docs =
            futures::future::try_join_all(keys.iter().map(|k| self.fetch_doc(&k.session_key)))
                .await?;

        let total = keys.len();
        let sessions: Vec<Session> = docs
            .into_iter()
            .flatten()
            .map(DbSessionDoc::into_session)
            .collect();
        if sessions.len() != total {
            warn!(
                indexed = total,
                found = sessions.len(),
                "session_index has entries without documents"
            );
        }
        Ok(sessions)
    }

    #[instrument(skip(self))]
    async fn get_session(&self, id: &str) -> StorageResult<Option<Session>> {
        self.ensure_ready().await?;
        Ok(self.fetch_doc(id).await?.map(DbSessionDoc::into_session))
    }

    #[instrument(skip(self, criteria), fields(criteria = criteria.len()))]
    async fn create_session(
        &self,
        presenter: &str,
        created_by: &str,
        criteria: Vec<Criterion>,
    ) -> StorageResult<Session> {
        self.ensure_ready().await?;

        let session = Session::new(presenter, created_by, criteria);
        let doc = DbSessionDoc::from(session.clone());
        let key = doc.session_key.clone();
        let created_at = doc.created_at.clone();

        self.db
            .query(CREATE_SESSION_TX)
            .bind(("doc", doc))
            .bind(("key", key))
            .bind(("created_at", created_at))
            .await?
            .check()?;

        debug!(session_id = %session.id, "session document created");
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
        self.ensure_ready().await?;

        let evaluation = DbEvaluation::from(Evaluation::new(evaluator, ratings, overall_score));
        let key_owned = session_id.to_string();

        let mut res = self
            .db
            .query(format!(
                "UPDATE session_docs SET evaluations += $evaluation \
                 WHERE session_key = $key RETURN {DOC_FIELDS}"
            ))
            .bind(("evaluation", evaluation))
            .bind(("key", key_owned))
            .await?;

        let updated: Vec<DbSessionDoc> = res.take(0)?;
        Ok(updated.into_iter().next().map(DbSessionDoc::into_session))
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, id: &str) -> StorageResult<bool> {
        self.ensure_ready().await?;

        let key_owned = id.to_string();
        let mut res = self
            .db
            .query("DELETE session_docs WHERE session_key = $key RETURN BEFORE")
            .bind(("key", key_owned.clone()))
            .await?;
        let deleted: Vec<DbSessionDoc> = res.take(0)?;

        self.db
            .query("DELETE session_index WHERE session_key = $key")
            .bind(("key", key_owned))
            .await?
            .check()?;

        Ok(!deleted.is_empty())
    }
}
