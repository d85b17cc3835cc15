//! `tenantsyncd`: HTTP server for tenant configuration.
//!
//! Exposes the versioned store, backups and cached upstream reads, and
//! notifies the agent after every committed write.

pub mod app;
pub mod error;
pub mod logging;
pub mod routes;

pub use app::{AppBootstrap, AppState, SharedState};
pub use routes::router;
