//! Configuration loading and validation
//!
//! This module reads djin.yml files, resolves their includes, renders the
//! task templates and validates task definitions.

pub mod cache;
pub mod include;
pub mod loader;
pub mod merge;
pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use include::{IncludeDirective, IncludeKind, IncludeResolver};
pub use loader::ConfigLoader;
pub use parse::DEFAULT_CONFIG_FILE;
pub use schema::*;
pub use types::*;
