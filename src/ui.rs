//! Terminal output helpers
//!
//! Everything here writes to stderr so task output on stdout stays clean.

use colored::Colorize;
use std::collections::HashSet;
use std::fmt;

/// Print `[Kind] message` for an error that ends the invocation
pub fn error(kind: &str, message: impl fmt::Display) {
    eprintln!("{} {}", format!("[{}]", kind).red().bold(), message);
}

pub fn warning(message: impl fmt::Display) {
    eprintln!("{} {}", "[WARNING]".yellow().bold(), message);
}

pub fn deprecated(message: impl fmt::Display) {
    eprintln!("{} {}", "[DEPRECATED]".yellow(), message);
}

/// Progress line for long running operations (clone, fetch, remove)
pub fn info(message: impl fmt::Display) {
    eprintln!("{}", message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    Warning,
    Deprecated,
}

/// Shows each distinct warning once and remembers what was shown
#[derive(Debug, Default)]
pub struct WarningLog {
    seen: HashSet<(WarningKind, String)>,
    emitted: Vec<(WarningKind, String)>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print the warning unless the same one was already printed.
    /// Returns whether it was printed.
    pub fn emit(&mut self, kind: WarningKind, message: impl Into<String>) -> bool {
        let message = message.into();
        if !self.seen.insert((kind, message.clone())) {
            return false;
        }

        match kind {
            WarningKind::Warning => warning(&message),
            WarningKind::Deprecated => deprecated(&message),
        }
        self.emitted.push((kind, message));
        true
    }

    pub fn warn(&mut self, message: impl Into<String>) -> bool {
        self.emit(WarningKind::Warning, message)
    }

    pub fn deprecate(&mut self, message: impl Into<String>) -> bool {
        self.emit(WarningKind::Deprecated, message)
    }

    /// Warnings in the order they were first shown
    pub fn emitted(&self) -> &[(WarningKind, String)] {
        &self.emitted
    }
}
