//! Error types for Djin

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Djin operations
pub type Result<T> = std::result::Result<T, DjinError>;

/// Main error type for Djin
#[derive(Error, Debug)]
pub enum DjinError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Git errors while managing the remote include cache
    #[error(transparent)]
    Git(#[from] GitError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DjinError {
    /// Name printed between brackets when the error reaches the user
    pub fn kind(&self) -> &'static str {
        match self {
            DjinError::Config(e) => e.kind(),
            DjinError::Execution(e) => e.kind(),
            DjinError::Git(_) => "GitError",
            DjinError::Io(_) => "IOError",
        }
    }
}

/// Field errors reported for a single task, keyed by dotted field path
/// (`docker.run`, `docker-compose.service`, ...). The empty key holds
/// errors about the task as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                first = false;
                if field.is_empty() {
                    write!(f, "{}", message)?;
                } else {
                    write!(f, "{}: {}", field, message)?;
                }
            }
        }
        Ok(())
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0}")]
    FileNotFound(String),

    #[error("File: {path}\n  {message}")]
    InvalidConfigFile { path: PathBuf, message: String },

    #[error("Missing djin_version in {0}")]
    MissingVersion(PathBuf),

    #[error("Version {declared} is not supported, use {current} or higher")]
    VersionNotSupported { declared: String, current: String },

    #[error("{0}")]
    InvalidIncludeSpec(String),

    #[error("{task}: {errors}")]
    InvalidTaskSyntax { task: String, errors: FieldErrors },

    #[error("Circular include detected: {0}")]
    CircularInclude(String),
}

impl ConfigError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::FileNotFound(_) => "FileNotFoundError",
            ConfigError::InvalidConfigFile { .. } => "InvalidConfigFileError",
            ConfigError::MissingVersion(_) => "MissingVersionError",
            ConfigError::VersionNotSupported { .. } => "VersionNotSupportedError",
            ConfigError::InvalidIncludeSpec(_) => "InvalidIncludeSpec",
            ConfigError::InvalidTaskSyntax { .. } => "InvalidTaskSyntax",
            ConfigError::CircularInclude(_) => "CircularIncludeError",
        }
    }
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Task '{0}' failed")]
    TaskFailed(String),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Invalid template in task '{task}': {error}")]
    Template { task: String, error: TemplateError },
}

impl ExecutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionError::TaskFailed(_) | ExecutionError::Spawn { .. } => "TaskError",
            ExecutionError::CircularDependency(_) => "CircularDependencyError",
            ExecutionError::TaskNotFound(_) => "TaskNotFoundError",
            ExecutionError::Template { .. } => "TemplateError",
        }
    }
}

/// Template rendering errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Section '{0}' is never closed")]
    UnclosedSection(String),

    #[error("Unexpected closing tag '{0}'")]
    UnexpectedClose(String),
}

/// A git invocation that exited unsuccessfully
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git {args} failed: {stderr}")]
    CommandFailed { args: String, stderr: String },

    #[error("Failed to run git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: io::Error,
    },
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for template rendering
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Specialized result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;
