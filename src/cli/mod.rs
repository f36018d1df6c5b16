//! CLI interface and argument parsing
//!
//! Root options (`-f/--file`, `-v/--version`, arguments after `--`) are read
//! before the configuration is loaded; the task subcommands are then built
//! from the loaded tasks.

pub mod app;

// Re-export main types
pub use app::*;
