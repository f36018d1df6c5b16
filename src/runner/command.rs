//! Command execution
//!
//! This module handles executing shell commands.

use crate::error::{ExecutionError, ExecutionResult};
use std::process::{Command as StdCommand, Stdio};

/// Runs shell command lines
pub trait Shell {
    /// Run `command` to completion, returning whether it exited successfully
    fn run(&mut self, command: &str) -> ExecutionResult<bool>;
}

/// Runs commands through `sh -c` with inherited stdio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        SystemShell
    }
}

impl Shell for SystemShell {
    fn run(&mut self, command: &str) -> ExecutionResult<bool> {
        let mut process = StdCommand::new("sh");
        process.arg("-c").arg(command);
        process.stdin(Stdio::inherit());
        process.stdout(Stdio::inherit());
        process.stderr(Stdio::inherit());

        tracing::debug!(%command, "running command");
        let status = process.status().map_err(|source| ExecutionError::Spawn {
            command: command.to_string(),
            source,
        })?;

        Ok(status.success())
    }
}
