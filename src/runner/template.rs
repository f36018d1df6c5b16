//! Template rendering for task definitions
//!
//! Supports the mustache subset used in djin files:
//! - `{{name}}`, `{{{name}}}`, `{{& name}}` - interpolation, absent names render empty
//! - `{{#name}}...{{/name}}` - rendered iff `name` is truthy
//! - `{{^name}}...{{/name}}` - rendered iff `name` is falsy
//! - `{{! comment}}` - dropped
//!
//! Nothing is HTML-escaped: rendered text ends up in shell commands.

use crate::error::{TemplateError, TemplateResult};
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\{\s*(?P<raw>[^}]*?)\s*\}\}\}|\{\{\s*(?P<sigil>[#^/&!]?)\s*(?P<name>[^}]*?)\s*\}\}")
        .expect("template tag regex is valid")
});

/// Name of the local holding the space-joined arguments given after `--`
pub const ARGS: &str = "args";

/// Name of the local telling whether any argument was given after `--`
pub const HAS_ARGS: &str = "args?";

/// A value visible to templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Local {
    Text(String),
    Flag(bool),
}

impl Local {
    /// Present, non-empty and not `false`
    pub fn is_truthy(&self) -> bool {
        match self {
            Local::Text(text) => !text.is_empty(),
            Local::Flag(flag) => *flag,
        }
    }

    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Local::Text(text) => Cow::Borrowed(text),
            Local::Flag(flag) => Cow::Owned(flag.to_string()),
        }
    }
}

impl From<&str> for Local {
    fn from(value: &str) -> Self {
        Local::Text(value.to_string())
    }
}

impl From<String> for Local {
    fn from(value: String) -> Self {
        Local::Text(value)
    }
}

impl From<bool> for Local {
    fn from(value: bool) -> Self {
        Local::Flag(value)
    }
}

/// The variable mapping a template is rendered against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals(HashMap<String, Local>);

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build locals from environment-style string pairs
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        Locals(
            env.iter()
                .map(|(key, value)| (key.clone(), Local::Text(value.clone())))
                .collect(),
        )
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Local>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Local> {
        self.0.get(key)
    }

    /// Merge `other` over these locals; `other` wins on collisions
    pub fn extend<I>(&mut self, other: I)
    where
        I: IntoIterator<Item = (String, Local)>,
    {
        self.0.extend(other);
    }

    /// Inject the reserved `args` and `args?` locals
    pub fn with_args(mut self, args: &[String]) -> Self {
        self.insert(ARGS, args.join(" "));
        self.insert(HAS_ARGS, !args.is_empty());
        self
    }
}

#[derive(Debug)]
enum Node {
    Text(String),
    Var(String),
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
}

/// Render `template` against `locals`
pub fn render(template: &str, locals: &Locals) -> TemplateResult<String> {
    if !template.contains("{{") {
        return Ok(template.to_string());
    }

    let nodes = parse(template)?;
    let mut out = String::with_capacity(template.len());
    render_nodes(&nodes, locals, &mut out);
    Ok(out)
}

fn parse(template: &str) -> TemplateResult<Vec<Node>> {
    // Open sections: (name, inverted, children collected so far)
    let mut stack: Vec<(String, bool, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut last = 0;

    for caps in TAG.captures_iter(template) {
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(last..last);
        if whole.start > last {
            current.push(Node::Text(template[last..whole.start].to_string()));
        }
        last = whole.end;

        if let Some(raw) = caps.name("raw") {
            current.push(Node::Var(raw.as_str().to_string()));
            continue;
        }

        let sigil = caps.name("sigil").map_or("", |m| m.as_str());
        let name = caps.name("name").map_or("", |m| m.as_str()).to_string();

        match sigil {
            "#" | "^" => {
                stack.push((name, sigil == "^", std::mem::take(&mut current)));
            }
            "/" => {
                let (open, inverted, parent) = match stack.pop() {
                    Some(frame) => frame,
                    None => return Err(TemplateError::UnexpectedClose(name)),
                };
                if open != name {
                    return Err(TemplateError::UnexpectedClose(name));
                }
                let children = std::mem::replace(&mut current, parent);
                current.push(Node::Section {
                    name: open,
                    inverted,
                    children,
                });
            }
            "!" => {}
            _ => current.push(Node::Var(name)),
        }
    }

    if let Some((name, _, _)) = stack.pop() {
        return Err(TemplateError::UnclosedSection(name));
    }

    if last < template.len() {
        current.push(Node::Text(template[last..].to_string()));
    }

    Ok(current)
}

fn render_nodes(nodes: &[Node], locals: &Locals, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Var(name) => {
                if let Some(value) = locals.get(name) {
                    out.push_str(&value.as_text());
                }
            }
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let truthy = locals.get(name).is_some_and(Local::is_truthy);
                if truthy != *inverted {
                    render_nodes(children, locals, out);
                }
            }
        }
    }
}
