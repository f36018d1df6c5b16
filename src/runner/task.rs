//! Runtime task representation
//!
//! Tasks are what the interpreter produces from the resolved configuration:
//! ready to run shell commands plus the metadata the CLI needs.

/// A task ready to be executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Task name
    pub name: String,

    /// Shown in the help listing
    pub description: String,

    /// Command run by the task, absent for dependency-only tasks
    pub command: Option<String>,

    /// Image build run before `command`
    pub build_command: Option<String>,

    /// `command` built from the task as written, before rendering
    pub raw_command: Option<String>,

    pub aliases: Vec<String>,

    /// Names of the tasks run before this one, in order
    pub depends_on: Vec<String>,
}

impl Task {
    /// Whether `name` is this task's name or one of its aliases
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }
}

/// Ordered collection of the tasks of a configuration
#[derive(Debug, Clone, Default)]
pub struct TaskRepository {
    tasks: Vec<Task>,
}

impl TaskRepository {
    pub fn new(tasks: Vec<Task>) -> Self {
        TaskRepository { tasks }
    }

    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    /// Find a task by name, falling back to aliases
    pub fn find(&self, name: &str) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|task| task.name == name)
            .or_else(|| self.tasks.iter().find(|task| task.answers_to(name)))
    }

    /// Tasks whose name is in `names`, in repository order
    pub fn find_by_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| names.iter().any(|name| name.as_ref() == task.name))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
