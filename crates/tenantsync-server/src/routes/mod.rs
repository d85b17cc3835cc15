//! HTTP surface of `tenantsyncd`.

pub mod actor;
pub mod backups;
pub mod config;
pub mod health;
pub mod upstream;

use axum::Router;
use axum::routing::get;

use crate::app::SharedState;

pub use actor::{ACTOR_HEADER, Actor};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(
            "/config/{entity_id}",
            get(config::get_config)
                .put(config::update_section)
                .delete(config::delete_config),
        )
        .route(
            "/backups/{entity_id}",
            get(backups::list_backups).post(backups::backup_action),
        )
        .route(
            "/backups/{entity_id}/{backup_id}",
            get(backups::get_backup).delete(backups::delete_backup),
        )
        .route(
            "/upstream/{entity_id}/{resource}",
            get(upstream::get_upstream),
        )
        .with_state(state)
}
