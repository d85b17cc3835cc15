pub mod backup;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod propagation;
pub mod upstream;

// Re-export common error type
pub use error::{Result, TenantSyncError};
