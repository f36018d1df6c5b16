//! Execution context for task running
//!
//! The context tracks the state needed while tasks run: the arguments given
//! after `--`, the environment visible to the runtime rendering pass and the
//! stack of tasks currently running.

use crate::runner::template::Locals;
use std::collections::HashMap;
use std::env;

/// State shared by one execution run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Arguments given after `--`
    pub args: Vec<String>,

    /// Environment variables visible to templates
    pub env: HashMap<String, String>,

    /// Stack of tasks being executed (for detecting recursion)
    pub task_stack: Vec<String>,
}

impl RunContext {
    /// Create a context reading the process environment
    pub fn new() -> Self {
        RunContext {
            args: Vec::new(),
            env: env::vars().collect(),
            task_stack: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Locals of the runtime rendering pass: environment plus `args`/`args?`
    pub fn locals(&self) -> Locals {
        Locals::from_env(&self.env).with_args(&self.args)
    }

    /// Push a task onto the execution stack
    pub fn push_task(&mut self, task_name: impl Into<String>) {
        self.task_stack.push(task_name.into());
    }

    /// Pop a task from the execution stack
    pub fn pop_task(&mut self) -> Option<String> {
        self.task_stack.pop()
    }

    /// Check if a task is in the execution stack (detect recursion)
    pub fn is_task_in_stack(&self, task_name: &str) -> bool {
        self.task_stack.iter().any(|t| t == task_name)
    }

    /// The running chain followed by `next`, `a -> b -> next`
    pub fn chain_with(&self, next: &str) -> String {
        self.task_stack
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(next))
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}
