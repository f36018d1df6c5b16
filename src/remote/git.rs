//! Git operations used by the remote include cache
//!
//! The cache only needs a handful of porcelain commands, so they go through
//! the `git` executable found on `PATH`.

use crate::error::{GitError, GitResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// The git operations the remote config repository relies on
pub trait GitClient {
    /// Clone `url` into `target`
    fn clone_repo(&mut self, url: &str, target: &Path) -> GitResult<()>;

    fn fetch(&mut self, repo: &Path) -> GitResult<()>;

    /// Check out a branch, tag or commit
    fn checkout(&mut self, repo: &Path, version: &str) -> GitResult<()>;

    fn pull(&mut self, repo: &Path, version: &str) -> GitResult<()>;

    /// Name of the checked out branch, `None` when detached
    fn current_branch(&mut self, repo: &Path) -> GitResult<Option<String>>;
}

/// [`GitClient`] backed by the `git` command line
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        GitCli
    }
}

impl GitClient for GitCli {
    fn clone_repo(&mut self, url: &str, target: &Path) -> GitResult<()> {
        GitCommand::new(["clone", "--progress", url])
            .arg(target.to_string_lossy())
            .inherit_stdio()
            .execute()
            .map(drop)
    }

    fn fetch(&mut self, repo: &Path) -> GitResult<()> {
        GitCommand::new(["fetch"])
            .current_dir(repo)
            .inherit_stdio()
            .execute()
            .map(drop)
    }

    fn checkout(&mut self, repo: &Path, version: &str) -> GitResult<()> {
        GitCommand::new(["checkout", version])
            .current_dir(repo)
            .execute()
            .map(drop)
    }

    fn pull(&mut self, repo: &Path, version: &str) -> GitResult<()> {
        GitCommand::new(["pull", "origin", version])
            .current_dir(repo)
            .inherit_stdio()
            .execute()
            .map(drop)
    }

    fn current_branch(&mut self, repo: &Path) -> GitResult<Option<String>> {
        let output = GitCommand::new(["branch", "--show-current"])
            .current_dir(repo)
            .execute()?;
        let branch = output.trim();
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }
}

/// A single git invocation
#[derive(Debug)]
struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    capture_output: bool,
}

impl GitCommand {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GitCommand {
            args: args.into_iter().map(Into::into).collect(),
            current_dir: None,
            capture_output: true,
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Let progress output through to the terminal
    fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Run the command, returning its stdout when captured
    fn execute(self) -> GitResult<String> {
        let joined = self.args.join(" ");
        let mut command = Command::new("git");
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        if self.capture_output {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        tracing::debug!(args = %joined, dir = ?self.current_dir, "running git");
        let output = command.output().map_err(|source| GitError::Spawn {
            args: joined.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                args: joined,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
