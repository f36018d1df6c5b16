//! Task execution engine
//!
//! This module turns resolved configuration into tasks, builds their shell
//! commands and runs them with their dependencies.

pub mod builder;
pub mod command;
pub mod context;
pub mod executor;
pub mod interpreter;
pub mod task;
pub mod template;

// Re-export main types
pub use builder::BuiltCommand;
pub use command::{Shell, SystemShell};
pub use context::RunContext;
pub use executor::Executor;
pub use interpreter::Interpreter;
pub use task::{Task, TaskRepository};
pub use template::{render, Local, Locals};
