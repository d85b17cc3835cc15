//! Client edit session: optimistic local buffer with debounced commits.

mod debounce;
mod session;
mod state;
mod store_client;

pub use debounce::{CommitFn, DebouncedCommit, FlushPredicate, Trigger};
pub use session::{EditSession, SessionOptions};
pub use state::SyncState;
pub use store_client::LocalConfigClient;
