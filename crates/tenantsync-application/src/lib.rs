//! Application layer for tenantsync.
//!
//! Use cases that coordinate the domain model with storage and the outbound
//! agent notifier: the versioned store, backups, propagation, cached upstream
//! reads and the client edit session.

pub mod backup_manager;
pub mod config_usecase;
pub mod edit_session;
pub mod fetch;
pub mod propagation;
pub mod store;

pub use backup_manager::{BackupManager, CaptureBefore, PruneReport};
pub use config_usecase::ConfigUseCase;
pub use edit_session::{EditSession, LocalConfigClient, SessionOptions, SyncState};
pub use fetch::{CachedFetcher, FetchOptions, FetchSource, Fetched, RemoteError, RetryPolicy};
pub use propagation::PropagationDispatcher;
pub use store::{CommitHook, SectionUpdate, VersionedStore};
