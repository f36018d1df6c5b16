//! Core configuration types
//!
//! This module defines the data structures that represent a djin.yml file
//! once it has been resolved, and the typed view of a single task.

use crate::config::include::IncludeDirective;
use crate::config::merge::deep_merge_mappings;
use crate::runner::template::Local;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Key holding the minimum engine version a file requires
pub const VERSION_KEY: &str = "djin_version";

/// Top-level keys that never name a task in legacy files
pub const RESERVED_KEYS: &[&str] = &[VERSION_KEY, "variables", "include", "tasks"];

/// Declared variables, visible to templates
pub type Variables = BTreeMap<String, Local>;

/// A configuration file with its includes resolved, rendered and merged
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub schema_version: String,
    pub variables: Variables,
    /// Task definitions after template rendering
    pub tasks: Mapping,
    /// Task definitions as written, used to describe tasks
    pub raw_tasks: Mapping,
    /// Every include directive met while resolving, nested ones included
    pub include_directives: Vec<IncludeDirective>,
}

impl ResolvedConfig {
    /// Combine with a later config; `other` wins on conflicts and maps merge
    /// recursively. Include directives are concatenated without duplicates.
    pub fn deep_merge(mut self, other: ResolvedConfig) -> ResolvedConfig {
        self.schema_version = other.schema_version;
        self.variables.extend(other.variables);
        deep_merge_mappings(&mut self.tasks, other.tasks);
        deep_merge_mappings(&mut self.raw_tasks, other.raw_tasks);
        for directive in other.include_directives {
            if !self.include_directives.contains(&directive) {
                self.include_directives.push(directive);
            }
        }
        self
    }

    /// Rendered task names in definition order
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.keys().filter_map(Value::as_str).collect()
    }
}

/// A list of shell commands, written as a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandList {
    One(String),
    Many(Vec<String>),
}

impl CommandList {
    /// Lists run one after the other, stopping at the first failure
    pub fn joined(&self) -> String {
        match self {
            CommandList::One(command) => command.clone(),
            CommandList::Many(commands) => commands.join(" && "),
        }
    }
}

/// The `run` entry of an execution block
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RunParams {
    Commands(CommandList),
    Detailed {
        commands: CommandList,
        #[serde(default)]
        options: Option<String>,
    },
}

impl RunParams {
    /// The joined command set and its run options
    pub fn split(&self) -> (String, Option<&str>) {
        match self {
            RunParams::Commands(commands) => (commands.joined(), None),
            RunParams::Detailed { commands, options } => (commands.joined(), options.as_deref()),
        }
    }
}

/// The `docker.build` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BuildParams {
    Context(String),
    Detailed {
        context: String,
        #[serde(default)]
        options: Option<String>,
    },
}

impl BuildParams {
    pub fn context(&self) -> &str {
        match self {
            BuildParams::Context(context) => context,
            BuildParams::Detailed { context, .. } => context,
        }
    }

    pub fn options(&self) -> Option<&str> {
        match self {
            BuildParams::Context(_) => None,
            BuildParams::Detailed { options, .. } => options.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DockerParams {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub build: Option<BuildParams>,
    pub run: RunParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ComposeParams {
    pub service: String,
    #[serde(default)]
    pub options: Option<String>,
    pub run: RunParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalParams {
    pub run: RunParams,
}

/// How a task's command is executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    Docker(DockerParams),
    Compose(ComposeParams),
    Local(LocalParams),
}

/// Task options exactly as they deserialize; see [`TaskDefinition`]
#[derive(Debug, Clone, Deserialize)]
pub struct RawTaskOptions {
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub docker: Option<DockerParams>,

    #[serde(rename = "docker-compose", default)]
    pub docker_compose: Option<ComposeParams>,

    #[serde(default)]
    pub local: Option<LocalParams>,
}

/// A validated task definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDefinition {
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub depends_on: Vec<String>,
    /// `None` for tasks that only aggregate dependencies
    pub mode: Option<ExecutionMode>,
}

impl From<RawTaskOptions> for TaskDefinition {
    fn from(raw: RawTaskOptions) -> Self {
        // docker wins if several blocks slipped through validation
        let mode = match (raw.docker, raw.docker_compose, raw.local) {
            (Some(docker), _, _) => Some(ExecutionMode::Docker(docker)),
            (None, Some(compose), _) => Some(ExecutionMode::Compose(compose)),
            (None, None, Some(local)) => Some(ExecutionMode::Local(local)),
            (None, None, None) => None,
        };

        TaskDefinition {
            description: raw.description,
            aliases: raw.aliases,
            depends_on: raw.depends_on,
            mode,
        }
    }
}
