//! Configuration management

pub mod loader;
mod schema;

pub use loader::{load_config, load_config_from_path};
pub use schema::*;
