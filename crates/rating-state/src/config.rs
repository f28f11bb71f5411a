//! Backend selection
//!
//! The backend is chosen from environment variables at startup. When no
//! variable is set the service falls back to the in-memory store.
//!
//! Precedence (first match wins):
//! 1. `DATABASE_URL` / `RATING_SQLITE_PATH` → SQLite
//! 2. `SURREALDB_ENDPOINT` (+ credentials) → SurrealDB with sign-in
//! 3. `SURREALDB_URL` → SurrealDB without sign-in
//! 4. nothing → memory

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::StorageError;
use crate::memory::MemorySessionStore;
use crate::sqlite_store::SqliteSessionStore;
use crate::storage_traits::{SessionStore, StorageResult};
use crate::surreal_store::{SurrealSessionStore, DEFAULT_DATABASE, DEFAULT_NAMESPACE};

/// Configuration for a remote SurrealDB with sign-in.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    /// WebSocket endpoint URL (e.g., "wss://xxx.aws-use1.surrealdb.cloud")
    pub endpoint: String,
    pub username: String,
    pub password: String,
    /// Namespace (default: "rating")
    pub namespace: String,
    /// Database name (default: "main")
    pub database: String,
    /// Whether this is a root user (true) or database user (false)
    pub is_root: bool,
}

impl CloudConfig {
    /// Create a new configuration for a database user
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            is_root: false,
        }
    }

    /// Set custom namespace
    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    /// Set custom database
    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    /// Set whether this is a root user
    pub fn with_root(mut self, is_root: bool) -> Self {
        self.is_root = is_root;
        self
    }
}

/// Which store to build.
#[derive(Debug, Clone)]
pub enum BackendConfig {
    Memory,
    Sqlite {
        /// `None` for a private in-memory database.
        path: Option<PathBuf>,
    },
    SurrealUrl {
        url: String,
        namespace: String,
        database: String,
    },
    SurrealCloud(CloudConfig),
}

impl BackendConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL").or_else(|| get("RATING_SQLITE_PATH")) {
            return Ok(BackendConfig::Sqlite {
                path: parse_sqlite_location(&url)?,
            });
        }

        let namespace = get("SURREALDB_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let database = get("SURREALDB_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        if let Some(endpoint) = get("SURREALDB_ENDPOINT") {
            let username = get("SURREALDB_USERNAME").ok_or_else(|| {
                StorageError::Configuration(
                    "SURREALDB_ENDPOINT is set but SURREALDB_USERNAME is not".to_string(),
                )
            })?;
            let password = get("SURREALDB_PASSWORD").ok_or_else(|| {
                StorageError::Configuration(
                    "SURREALDB_ENDPOINT is set but SURREALDB_PASSWORD is not".to_string(),
                )
            })?;
            let is_root = get("SURREALDB_ROOT")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);

            return Ok(BackendConfig::SurrealCloud(
                CloudConfig::new(endpoint, username, password)
                    .with_namespace(namespace)
                    .with_database(database)
                    .with_root(is_root),
            ));
        }

        if let Some(url) = get("SURREALDB_URL") {
            return Ok(BackendConfig::SurrealUrl {
                url,
                namespace,
                database,
            });
        }

        Ok(BackendConfig::Memory)
    }

    /// Whether data outlives the process.
    pub fn is_persistent(&self) -> bool {
        match self {
            BackendConfig::Memory => false,
            BackendConfig::Sqlite { path } => path.is_some(),
            BackendConfig::SurrealUrl { url, .. } => !url.starts_with("mem://"),
            BackendConfig::SurrealCloud(_) => true,
        }
    }
}

/// Accepts `sqlite://path`, `sqlite:path`, `sqlite::memory:`, `:memory:` or
/// a bare path.
fn parse_sqlite_location(raw: &str) -> StorageResult<Option<PathBuf>> {
    let trimmed = raw.trim();
    let rest = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);

    if rest == ":memory:" {
        return Ok(None);
    }
    if rest.is_empty() {
        return Err(StorageError::Configuration(format!(
            "no database path in {raw:?}"
        )));
    }
    if rest.contains("://") {
        return Err(StorageError::Configuration(format!(
            "unsupported database URL {raw:?}; only sqlite is supported"
        )));
    }
    Ok(Some(PathBuf::from(rest)))
}

/// Build the configured store.
pub async fn open_store(config: &BackendConfig) -> StorageResult<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match config {
        BackendConfig::Memory => {
            warn!("no storage backend configured; sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionStore::new())
        }
        BackendConfig::Sqlite { path: Some(path) } => Arc::new(SqliteSessionStore::open(path)?),
        BackendConfig::Sqlite { path: None } => Arc::new(SqliteSessionStore::in_memory()?),
        BackendConfig::SurrealUrl {
            url,
            namespace,
            database,
        } => Arc::new(SurrealSessionStore::connect(url, namespace, database).await?),
        BackendConfig::SurrealCloud(cloud) => {
            Arc::new(SurrealSessionStore::connect_cloud(cloud.clone()).await?)
        }
    };

    info!(backend = store.backend_name(), "session store selected");
    Ok(store)
}
