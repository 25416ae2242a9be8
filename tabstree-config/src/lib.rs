//! Configuration system for tabstree.
//!
//! This crate provides configuration loading, saving, and default values
//! for the tab hierarchy store. It includes:
//!
//! - The top-level [`Config`] struct and its YAML persistence
//! - Default value functions used by serde
//! - Typed [`ConfigError`] variants for callers that want to match on failures

pub mod config;
pub mod defaults;
pub mod error;
mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::ConfigError;
pub use types::LogLevel;
