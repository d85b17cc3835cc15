//! Tenant configuration entities.

pub mod defaults;
pub mod model;
pub mod repository;
pub mod validation;

pub use defaults::default_sections;
pub use model::{ConfigEntity, merge_shallow};
pub use repository::ConfigRepository;
pub use validation::{validate_entity_id, validate_section_name};
