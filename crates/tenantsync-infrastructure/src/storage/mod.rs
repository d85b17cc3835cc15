//! Storage layer: versioned record directories and the secrets file.

mod dir_storage;
mod secret_storage;

pub use dir_storage::{is_not_found, open_dir_storage};
pub use secret_storage::{NOTIFY_SECRET_ENV, SecretStorage, SecretStorageError, UPSTREAM_TOKEN_ENV};
