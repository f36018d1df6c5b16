//! Djin - A declarative YAML task runner
//!
//! Djin reads tasks from `djin.yml` files and runs them locally, in docker
//! containers or through docker-compose. Files can include other files,
//! locally or from git repositories, and use mustache-style templates.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod remote;
pub mod runner;
pub mod ui;

// Re-export commonly used types
pub use error::{DjinError, Result};

/// Current version of Djin
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
