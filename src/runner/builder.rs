//! Command synthesis for each execution mode
//!
//! Builders only concatenate strings; templates were already rendered when
//! the configuration was loaded.

use crate::config::types::{ComposeParams, DockerParams, ExecutionMode, LocalParams};

/// Shell commands produced for a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    pub command: String,
    /// Image build run before `command`, docker tasks only
    pub build_command: Option<String>,
}

impl ExecutionMode {
    /// Build the shell commands of task `task_name`. `project_name` names
    /// default docker images.
    pub fn build(&self, project_name: &str, task_name: &str) -> BuiltCommand {
        match self {
            ExecutionMode::Docker(params) => build_docker(params, project_name, task_name),
            ExecutionMode::Compose(params) => build_compose(params),
            ExecutionMode::Local(params) => build_local(params),
        }
    }
}

fn build_docker(params: &DockerParams, project_name: &str, task_name: &str) -> BuiltCommand {
    let image = params
        .image
        .clone()
        .unwrap_or_else(|| format!("djin_{}_{}", project_name, task_name));

    let (run_command, run_options) = params.run.split();
    let command = squeeze(&format!(
        "docker run {} {} sh -c \"{}\"",
        run_options.unwrap_or_default(),
        image,
        run_command
    ));

    let build_command = params.build.as_ref().map(|build| {
        squeeze(&format!(
            "docker build {} {} -t {}",
            build.context(),
            build.options().unwrap_or_default(),
            image
        ))
    });

    BuiltCommand {
        command,
        build_command,
    }
}

fn build_compose(params: &ComposeParams) -> BuiltCommand {
    let (run_command, run_options) = params.run.split();
    let command = squeeze(&format!(
        "docker-compose {} run {} {} sh -c \"{}\"",
        params.options.as_deref().unwrap_or_default(),
        run_options.unwrap_or_default(),
        params.service,
        run_command
    ));

    BuiltCommand {
        command,
        build_command: None,
    }
}

fn build_local(params: &LocalParams) -> BuiltCommand {
    let (command, _) = params.run.split();
    BuiltCommand {
        command,
        build_command: None,
    }
}

/// Collapse runs of spaces into one
fn squeeze(text: &str) -> String {
    let mut squeezed = String::with_capacity(text.len());
    let mut previous_space = false;
    for c in text.chars() {
        if c == ' ' && previous_space {
            continue;
        }
        previous_space = c == ' ';
        squeezed.push(c);
    }
    squeezed
}
