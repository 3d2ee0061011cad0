//! Configuration module for the simforge build pipeline
//!
//! Provides types and parsing for `simforge.toml` / `config.json` project configuration.

pub mod loader;
pub mod schema;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::*;
