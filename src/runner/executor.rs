//! Task execution
//!
//! Dependencies run first, depth first, in repository order. Nothing is
//! memoized: a task reached through two paths runs twice.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::command::Shell;
use crate::runner::context::RunContext;
use crate::runner::task::{Task, TaskRepository};
use crate::runner::template;
use crate::ui;

/// Runs tasks and their dependencies through a [`Shell`]
pub struct Executor<'a, S: Shell> {
    repository: &'a TaskRepository,
    shell: S,
    context: RunContext,
}

impl<'a, S: Shell> Executor<'a, S> {
    pub fn new(repository: &'a TaskRepository, shell: S, context: RunContext) -> Self {
        Executor {
            repository,
            shell,
            context,
        }
    }

    /// Run `tasks` in order, stopping at the first failure
    pub fn run(&mut self, tasks: &[&Task]) -> ExecutionResult<()> {
        for task in tasks {
            self.run_task(task)?;
        }
        Ok(())
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn into_shell(self) -> S {
        self.shell
    }

    fn run_task(&mut self, task: &Task) -> ExecutionResult<()> {
        if self.context.is_task_in_stack(&task.name) {
            return Err(ExecutionError::CircularDependency(
                self.context.chain_with(&task.name),
            ));
        }

        for name in &task.depends_on {
            if self.repository.find_by_names(&[name]).is_empty() {
                ui::warning(format!(
                    "Task '{}' depends on unknown task '{}', skipping it",
                    task.name, name
                ));
            }
        }

        self.context.push_task(task.name.as_str());
        let result = self.run_with_dependencies(task);
        self.context.pop_task();
        result
    }

    fn run_with_dependencies(&mut self, task: &Task) -> ExecutionResult<()> {
        let repository = self.repository;
        for dependency in repository.find_by_names(&task.depends_on) {
            self.run_task(dependency)?;
        }

        tracing::info!(task = %task.name, "running task");
        if let Some(build_command) = &task.build_command {
            self.execute(build_command, task)?;
        }
        if let Some(command) = &task.command {
            self.execute(command, task)?;
        }

        Ok(())
    }

    /// Render `command` against the runtime locals and run it
    fn execute(&mut self, command: &str, task: &Task) -> ExecutionResult<()> {
        let rendered = template::render(command, &self.context.locals()).map_err(|error| {
            ExecutionError::Template {
                task: task.name.clone(),
                error,
            }
        })?;

        if !self.shell.run(&rendered)? {
            return Err(ExecutionError::TaskFailed(task.name.clone()));
        }
        Ok(())
    }
}
