//! Rating-State: session persistence for classroom rating
//!
//! This crate owns the `SessionStore` contract and its backends. A session
//! aggregate (header, criteria, evaluations) is stored and loaded as a unit.
//!
//! ## Key Components
//!
//! - `SessionStore`: backend-agnostic async store trait
//! - `MemorySessionStore`: in-process map, the fallback when nothing is configured
//! - `SqliteSessionStore`: relational tables with cascading delete
//! - `SurrealSessionStore`: one document per session plus a creation-time index
//! - `BackendConfig` / `open_store`: environment-driven backend selection

pub mod config;
mod error;
pub mod ids;
pub mod memory;
pub mod migrations;
pub mod sqlite_store;
pub mod storage_traits;
pub mod surreal_store;

pub use config::{open_store, BackendConfig, CloudConfig};
pub use error::StorageError;
pub use memory::MemorySessionStore;
pub use sqlite_store::SqliteSessionStore;
pub use storage_traits::{
    Criterion, Evaluation, Ratings, Score, Session, SessionStore, StorageResult, SCORE_MAX,
    SCORE_MIN,
};
pub use surreal_store::SurrealSessionStore;
