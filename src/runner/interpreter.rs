//! Turns a resolved configuration into runnable tasks

use crate::config::schema::parse_task_definition;
use crate::config::types::ResolvedConfig;
use crate::error::{ConfigError, ConfigResult, FieldErrors};
use crate::runner::task::Task;
use serde_yaml::Value;
use std::env;

/// Compiles task definitions into [`Task`]s
#[derive(Debug, Clone)]
pub struct Interpreter {
    project_name: String,
}

impl Interpreter {
    /// `project_name` names the default docker images, `djin_<project>_<task>`
    pub fn new(project_name: impl Into<String>) -> Self {
        Interpreter {
            project_name: project_name.into(),
        }
    }

    /// Interpreter named after the current directory
    pub fn for_current_dir() -> Self {
        let name = env::current_dir()
            .ok()
            .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();
        Interpreter::new(name)
    }

    /// Build every task of `config`, in definition order. The first invalid
    /// task fails the whole interpretation.
    pub fn interpret(&self, config: &ResolvedConfig) -> ConfigResult<Vec<Task>> {
        config
            .tasks
            .iter()
            .map(|(name, options)| {
                let name = task_name(name)?;
                self.interpret_task(&name, options, config.raw_tasks.get(name.as_str()))
            })
            .collect()
    }

    fn interpret_task(
        &self,
        name: &str,
        options: &Value,
        raw_options: Option<&Value>,
    ) -> ConfigResult<Task> {
        let definition = parse_task_definition(name, options)?;
        let built = definition
            .mode
            .as_ref()
            .map(|mode| mode.build(&self.project_name, name));

        // Tasks with rendered names have no raw counterpart
        let raw_command = raw_options
            .and_then(|raw| parse_task_definition(name, raw).ok())
            .and_then(|raw| raw.mode)
            .map(|mode| mode.build(&self.project_name, name).command);

        let (command, build_command) = match built {
            Some(built) => (Some(built.command), built.build_command),
            None => (None, None),
        };

        let description = definition.description.unwrap_or_else(|| {
            format!(
                "Runs: {}",
                raw_command
                    .as_deref()
                    .or(command.as_deref())
                    .unwrap_or_default()
            )
        });

        Ok(Task {
            name: name.to_string(),
            description,
            command,
            build_command,
            raw_command,
            aliases: definition.aliases,
            depends_on: definition.depends_on,
        })
    }
}

fn task_name(key: &Value) -> ConfigResult<String> {
    match key {
        Value::String(name) => Ok(name.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => {
            let mut errors = FieldErrors::new();
            errors.add("", "task name must be a string");
            Err(ConfigError::InvalidTaskSyntax {
                task: format!("{:?}", other),
                errors,
            })
        }
    }
}
