//! Include directives
//!
//! An include imports the variables and tasks of another djin file, either
//! relative to the including file or from a git repository cached under the
//! remote directory. Resolution only computes paths and checks existence; it
//! never touches the network.

use crate::error::{ConfigError, ConfigResult};
use regex::Regex;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::PathBuf;
use std::sync::LazyLock;

/// Branch used when an include does not name a version
pub const DEFAULT_VERSION: &str = "master";

static GIT_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:file://.+|[A-Za-z][\w+.-]*://(?:[^@/\s]+@)?[\w.-]+(?::\d+)?/\S+|[\w.-]+@[\w.-]+:\S+)$",
    )
    .expect("git uri regex is valid")
});

/// An include entry as written in the file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawInclude {
    pub file: String,
    #[serde(default)]
    pub context: Option<IncludeContext>,
    #[serde(default)]
    pub git: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Overrides applied to the included file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncludeContext {
    #[serde(default)]
    pub variables: Option<Mapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Local,
    Remote,
}

/// A resolved include entry
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDirective {
    /// Path as written in the include entry
    pub file: String,
    /// Override map merged over the included file, `{variables: {...}}`
    pub context: Mapping,
    pub git: Option<String>,
    pub version: String,
    /// Directory `file` is resolved against: the including file's
    /// directory for local includes, the remote directory for remote ones
    pub resolved_base_path: PathBuf,
    /// Where the included file is expected on disk
    pub full_path: PathBuf,
    pub missing: bool,
}

impl IncludeDirective {
    pub fn kind(&self) -> IncludeKind {
        if self.git.is_some() {
            IncludeKind::Remote
        } else {
            IncludeKind::Local
        }
    }

    pub fn is_remote(&self) -> bool {
        self.kind() == IncludeKind::Remote
    }

    /// Cache folder of a remote include, `<repo name>@<version>`
    pub fn folder_name(&self) -> Option<String> {
        self.git.as_deref().map(|git| folder_name(git, &self.version))
    }

    /// Whether the cache folder of a remote include exists
    pub fn repository_fetched(&self) -> bool {
        self.folder_name()
            .map(|folder| self.resolved_base_path.join(folder).exists())
            .unwrap_or(false)
    }
}

/// `<repo name>@<version>` for a git uri, the repo name being the last path
/// segment without its `.git` suffix
pub fn folder_name(git: &str, version: &str) -> String {
    let trimmed = git.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    format!("{}@{}", name, version)
}

/// Whether `git` looks like a cloneable uri
pub fn is_valid_git_uri(git: &str) -> bool {
    GIT_URI.is_match(git)
}

/// Turns raw include entries into resolved directives
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    base_directory: PathBuf,
    remote_directory: PathBuf,
}

impl IncludeResolver {
    pub fn new(base_directory: impl Into<PathBuf>, remote_directory: impl Into<PathBuf>) -> Self {
        IncludeResolver {
            base_directory: base_directory.into(),
            remote_directory: remote_directory.into(),
        }
    }

    /// Resolve the value of an `include` key. A missing or null key yields
    /// no directives.
    pub fn resolve(&self, includes: Option<&Value>) -> ConfigResult<Vec<IncludeDirective>> {
        let entries = match includes {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Sequence(entries)) => entries,
            Some(_) => {
                return Err(ConfigError::InvalidIncludeSpec(
                    "include must be a list".to_string(),
                ))
            }
        };

        entries
            .iter()
            .map(|entry| {
                let raw = parse_raw_include(entry)?;
                Ok(self.resolve_one(raw))
            })
            .collect()
    }

    fn resolve_one(&self, raw: RawInclude) -> IncludeDirective {
        let version = raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let mut context = Mapping::new();
        if let Some(variables) = raw.context.and_then(|c| c.variables) {
            context.insert(Value::from("variables"), Value::Mapping(variables));
        }

        let (resolved_base_path, full_path) = match &raw.git {
            Some(git) => {
                let full_path = self
                    .remote_directory
                    .join(folder_name(git, &version))
                    .join(&raw.file);
                (self.remote_directory.clone(), full_path)
            }
            None => (
                self.base_directory.clone(),
                self.base_directory.join(&raw.file),
            ),
        };

        let missing = !full_path.exists();
        tracing::debug!(
            file = %raw.file,
            path = %full_path.display(),
            missing,
            "resolved include"
        );

        IncludeDirective {
            file: raw.file,
            context,
            git: raw.git,
            version,
            resolved_base_path,
            full_path,
            missing,
        }
    }
}

fn parse_raw_include(entry: &Value) -> ConfigResult<RawInclude> {
    let raw: RawInclude = serde_yaml::from_value(entry.clone())
        .map_err(|e| ConfigError::InvalidIncludeSpec(format!("Invalid include: {}", e)))?;

    if raw.file.is_empty() {
        return Err(ConfigError::InvalidIncludeSpec(
            "Invalid include: file must be filled".to_string(),
        ));
    }
    if let Some(git) = &raw.git {
        if !is_valid_git_uri(git) {
            return Err(ConfigError::InvalidIncludeSpec(format!(
                "Invalid git uri in: {}",
                git
            )));
        }
    }
    if raw.version.as_deref() == Some("") {
        return Err(ConfigError::InvalidIncludeSpec(format!(
            "Invalid include {}: version must be filled",
            raw.file
        )));
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn includes(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name("https://github.com/org/myrepo.git", "master"), "myrepo@master");
        assert_eq!(folder_name("git@github.com:org/myrepo.git", "v1"), "myrepo@v1");
        assert_eq!(folder_name("git@host:myrepo", "v1"), "myrepo@v1");
        assert_eq!(folder_name("file:///srv/git/myrepo/", "dev"), "myrepo@dev");
    }

    #[test]
    fn test_git_uri_validation() {
        for uri in [
            "https://github.com/org/repo.git",
            "http://gitserver/myrepo.git",
            "ssh://git@github.com:22/org/repo.git",
            "git@github.com:org/repo.git",
            "file:///tmp/repo",
        ] {
            assert!(is_valid_git_uri(uri), "{}", uri);
        }

        for uri in ["not a uri", "github.com/org/repo", "https://", ""] {
            assert!(!is_valid_git_uri(uri), "{}", uri);
        }
    }

    #[test]
    fn test_resolve_local() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("present.yml"), "djin_version: '0.1.0'").unwrap();
        let resolver = IncludeResolver::new(dir.path(), dir.path().join("remote"));

        let directives = resolver
            .resolve(Some(&includes(
                "- file: present.yml\n  context:\n    variables:\n      a: b\n- file: absent.yml",
            )))
            .unwrap();

        assert_eq!(directives.len(), 2);
        assert_eq!(directives[0].kind(), IncludeKind::Local);
        assert!(!directives[0].missing);
        assert_eq!(directives[0].full_path, dir.path().join("present.yml"));
        assert_eq!(directives[0].resolved_base_path, dir.path());
        assert_eq!(
            directives[0].context,
            includes("variables:\n  a: b").as_mapping().unwrap().clone()
        );
        assert!(directives[1].missing);
        assert!(directives[1].context.is_empty());
    }

    #[test]
    fn test_resolve_remote() {
        let dir = TempDir::new().unwrap();
        let remote = dir.path().join("remote");
        fs::create_dir_all(remote.join("myrepo@master")).unwrap();
        fs::write(remote.join("myrepo@master/test.yml"), "").unwrap();
        let resolver = IncludeResolver::new(dir.path(), &remote);

        let directives = resolver
            .resolve(Some(&includes(
                "- file: test.yml\n  git: http://gitserver/myrepo.git\n- file: test.yml\n  git: http://gitserver/other.git\n  version: v2",
            )))
            .unwrap();

        assert_eq!(directives[0].kind(), IncludeKind::Remote);
        assert_eq!(directives[0].version, DEFAULT_VERSION);
        assert_eq!(directives[0].full_path, remote.join("myrepo@master/test.yml"));
        assert_eq!(directives[0].resolved_base_path, remote);
        assert!(!directives[0].missing);
        assert!(directives[0].repository_fetched());

        assert_eq!(directives[1].folder_name().as_deref(), Some("other@v2"));
        assert!(directives[1].missing);
        assert!(!directives[1].repository_fetched());
    }

    #[test]
    fn test_invalid_specs() {
        let resolver = IncludeResolver::new(".", "remote");

        for yaml in [
            "- context: {}",
            "- file: ''",
            "- file: a.yml\n  git: not-a-uri",
            "- file: a.yml\n  unknown: key",
            "- file: a.yml\n  context:\n    variables: [a]",
            "file: a.yml",
        ] {
            let result = resolver.resolve(Some(&includes(yaml)));
            assert!(
                matches!(result, Err(ConfigError::InvalidIncludeSpec(_))),
                "{}",
                yaml
            );
        }
    }

    #[test]
    fn test_no_includes() {
        let resolver = IncludeResolver::new(".", "remote");
        assert!(resolver.resolve(None).unwrap().is_empty());
        assert!(resolver.resolve(Some(&Value::Null)).unwrap().is_empty());
    }
}
