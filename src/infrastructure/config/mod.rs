//! Configuration loading and validation.

pub mod loader;

pub use loader::{load, load_from, ConfigError};
