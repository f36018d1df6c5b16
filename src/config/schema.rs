//! Task definition validation
//!
//! Task options are checked on the raw YAML value first so every problem in a
//! task is reported at once, keyed by field, before the typed view is built.

use crate::config::types::{RawTaskOptions, TaskDefinition};
use crate::error::{ConfigError, ConfigResult, FieldErrors};
use serde_yaml::{Mapping, Value};

const DOCKER: &str = "docker";
const COMPOSE: &str = "docker-compose";
const LOCAL: &str = "local";
const EXECUTION_KEYS: [&str; 3] = [DOCKER, COMPOSE, LOCAL];

/// Validate `options` and build the typed definition of task `name`
pub fn parse_task_definition(name: &str, options: &Value) -> ConfigResult<TaskDefinition> {
    let errors = validate_task(options);
    if !errors.is_empty() {
        return Err(ConfigError::InvalidTaskSyntax {
            task: name.to_string(),
            errors,
        });
    }

    let raw: RawTaskOptions = serde_yaml::from_value(options.clone()).map_err(|e| {
        let mut errors = FieldErrors::new();
        errors.add("", e.to_string());
        ConfigError::InvalidTaskSyntax {
            task: name.to_string(),
            errors,
        }
    })?;

    Ok(raw.into())
}

/// Check the options of a single task against the task schema
pub fn validate_task(options: &Value) -> FieldErrors {
    let mut errors = FieldErrors::new();

    let map = match options {
        Value::Mapping(map) => map,
        _ => {
            errors.add("", "must be a hash");
            return errors;
        }
    };

    if let Some(description) = map.get("description") {
        if !description.is_string() {
            errors.add("description", "must be a string");
        }
    }
    validate_string_list(map.get("aliases"), "aliases", &mut errors);
    validate_string_list(map.get("depends_on"), "depends_on", &mut errors);

    let blocks: Vec<&str> = EXECUTION_KEYS
        .into_iter()
        .filter(|key| map.contains_key(*key))
        .collect();
    let has_dependencies = map
        .get("depends_on")
        .and_then(Value::as_sequence)
        .is_some_and(|deps| !deps.is_empty());

    if blocks.is_empty() && !has_dependencies {
        errors.add("", "docker, docker-compose, local or depends_on key is required");
    }
    if blocks.len() > 1 {
        errors.add(
            "",
            format!(
                "only one of docker, docker-compose or local is allowed, found: {}",
                blocks.join(", ")
            ),
        );
    }

    if let Some(docker) = map.get(DOCKER) {
        validate_docker(docker, &mut errors);
    }
    if let Some(compose) = map.get(COMPOSE) {
        validate_compose(compose, &mut errors);
    }
    if let Some(local) = map.get(LOCAL) {
        validate_local(local, &mut errors);
    }

    errors
}

fn validate_docker(value: &Value, errors: &mut FieldErrors) {
    let Some(docker) = block(value, DOCKER, errors) else {
        return;
    };

    let image = docker.get("image").filter(|v| !v.is_null());
    if let Some(image) = image {
        if !image.is_string() {
            errors.add("docker.image", "must be a string");
        }
    }

    let build = docker.get("build").filter(|v| !v.is_null());
    if let Some(build) = build {
        validate_build(build, errors);
    }

    if image.is_none() && build.is_none() {
        errors.add(DOCKER, "image or build param is required for docker tasks");
    }

    validate_run(docker.get("run"), "docker.run", true, errors);
}

fn validate_build(value: &Value, errors: &mut FieldErrors) {
    match value {
        Value::String(context) => {
            if context.is_empty() {
                errors.add("docker.build", "must be filled");
            }
        }
        Value::Mapping(build) => {
            require_string(build.get("context"), "docker.build.context", errors);
            optional_string(build.get("options"), "docker.build.options", errors);
        }
        _ => errors.add("docker.build", "must be a string or a hash"),
    }
}

fn validate_compose(value: &Value, errors: &mut FieldErrors) {
    let Some(compose) = block(value, COMPOSE, errors) else {
        return;
    };

    require_string(compose.get("service"), "docker-compose.service", errors);
    optional_string(compose.get("options"), "docker-compose.options", errors);
    validate_run(compose.get("run"), "docker-compose.run", true, errors);
}

fn validate_local(value: &Value, errors: &mut FieldErrors) {
    let Some(local) = block(value, LOCAL, errors) else {
        return;
    };

    validate_run(local.get("run"), "local.run", false, errors);
}

fn block<'a>(value: &'a Value, field: &str, errors: &mut FieldErrors) -> Option<&'a Mapping> {
    match value {
        Value::Mapping(map) if !map.is_empty() => Some(map),
        Value::Mapping(_) | Value::Null => {
            errors.add(field, "must be filled");
            None
        }
        _ => {
            errors.add(field, "must be a hash");
            None
        }
    }
}

fn validate_run(value: Option<&Value>, field: &str, allow_options: bool, errors: &mut FieldErrors) {
    match value {
        None => errors.add(field, "is missing"),
        Some(Value::Mapping(run)) => {
            match run.get("commands") {
                None => errors.add(format!("{}.commands", field), "is missing"),
                Some(commands) => validate_commands(commands, &format!("{}.commands", field), errors),
            }

            if let Some(options) = run.get("options") {
                if allow_options {
                    optional_string(Some(options), &format!("{}.options", field), errors);
                } else {
                    errors.add(format!("{}.options", field), "is not allowed");
                }
            }
        }
        Some(commands) => validate_commands(commands, field, errors),
    }
}

fn validate_commands(value: &Value, field: &str, errors: &mut FieldErrors) {
    match value {
        Value::String(command) if command.is_empty() => errors.add(field, "must be filled"),
        Value::String(_) => {}
        Value::Sequence(commands) if commands.is_empty() => errors.add(field, "must be filled"),
        Value::Sequence(commands) => {
            if !commands.iter().all(Value::is_string) {
                errors.add(field, "must be a list of strings");
            }
        }
        Value::Null => errors.add(field, "must be filled"),
        _ => errors.add(field, "must be a string, a list of strings or a hash"),
    }
}

fn validate_string_list(value: Option<&Value>, field: &str, errors: &mut FieldErrors) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(items)) if items.iter().all(Value::is_string) => {}
        Some(_) => errors.add(field, "must be a list of strings"),
    }
}

fn require_string(value: Option<&Value>, field: &str, errors: &mut FieldErrors) {
    match value {
        None => errors.add(field, "is missing"),
        Some(Value::String(s)) if !s.is_empty() => {}
        Some(Value::String(_)) | Some(Value::Null) => errors.add(field, "must be filled"),
        Some(_) => errors.add(field, "must be a string"),
    }
}

fn optional_string(value: Option<&Value>, field: &str, errors: &mut FieldErrors) {
    match value {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => errors.add(field, "must be a string"),
    }
}
