//! `ratingd`: the classroom rating HTTP service.
//!
//! Routes live in [`api`], listener lifecycle in [`server`] and flags in
//! [`config`]. The binary wires these to an environment-selected store.

pub mod api;
pub mod config;
pub mod server;

pub use api::{build_router, ApiError, AppState};
pub use config::{ServerArgs, DEFAULT_BIND};
pub use server::{serve, start, ServerHandle};
