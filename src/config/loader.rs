//! Configuration resolution
//!
//! Loading a djin file reads it once through the content cache, applies the
//! include context, checks the declared version, recursively loads its
//! includes, renders the task templates and merges everything into a
//! [`ResolvedConfig`]. Files included by a file sit underneath it: its own
//! variables and tasks win over the ones it includes.

use crate::config::cache::ContentCache;
use crate::config::include::{IncludeDirective, IncludeKind, IncludeResolver};
use crate::config::merge::deep_merge_mappings;
use crate::config::parse::{
    ensure_supported, parse_document, parse_variables, schema_version, task_section,
};
use crate::config::types::{ResolvedConfig, Variables};
use crate::error::{ConfigError, ConfigResult};
use crate::runner::template::{self, Locals};
use crate::ui::WarningLog;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const LEGACY_TASKS_WARNING: &str = "Root tasks are deprecated and will be removed in Djin 1.0.0, \
                                    put the tasks under 'tasks' keyword";

/// Loads and resolves djin files
///
/// The loader owns the state shared by one resolution run: the content
/// cache, the warnings already shown and the chain of files being loaded.
#[derive(Debug)]
pub struct ConfigLoader {
    cache: ContentCache,
    warnings: WarningLog,
    loading: Vec<PathBuf>,
    remote_directory: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    skip_broken_remotes: bool,
}

impl ConfigLoader {
    /// Create a loader reading remote includes from `remote_directory`,
    /// with the process environment as template locals
    pub fn new(remote_directory: impl Into<PathBuf>) -> Self {
        ConfigLoader {
            cache: ContentCache::new(),
            warnings: WarningLog::new(),
            loading: Vec::new(),
            remote_directory: remote_directory.into(),
            args: Vec::new(),
            env: std::env::vars().collect(),
            skip_broken_remotes: false,
        }
    }

    /// Arguments given after `--`, rendered through `{{args}}`
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Replace the environment variables visible to templates
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Skip remote includes that are missing or fail to load instead of
    /// failing. Their directives are still recorded.
    pub fn skip_broken_remote_includes(mut self) -> Self {
        self.skip_broken_remotes = true;
        self
    }

    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub fn remote_directory(&self) -> &Path {
        &self.remote_directory
    }

    /// Load `file` relative to the current directory
    pub fn load(&mut self, file: impl AsRef<Path>) -> ConfigResult<ResolvedConfig> {
        self.load_with(file, &Mapping::new(), Path::new("."))
    }

    /// Load `file` relative to `base_directory`, merging `context` over its
    /// content before anything else is read from it
    pub fn load_with(
        &mut self,
        file: impl AsRef<Path>,
        context: &Mapping,
        base_directory: &Path,
    ) -> ConfigResult<ResolvedConfig> {
        let path = base_directory.join(file);
        if !path.is_file() {
            return Err(not_found(&path));
        }
        let path = fs::canonicalize(&path).map_err(|_| not_found(&path))?;

        if self.loading.contains(&path) {
            let chain: Vec<String> = self
                .loading
                .iter()
                .chain(std::iter::once(&path))
                .map(|p| p.display().to_string())
                .collect();
            return Err(ConfigError::CircularInclude(chain.join(" -> ")));
        }

        self.loading.push(path.clone());
        let result = self.resolve_file(&path, context);
        self.loading.pop();
        result
    }

    /// Load every file and merge them left to right, later files winning
    pub fn load_all<P: AsRef<Path>>(&mut self, files: &[P]) -> ConfigResult<ResolvedConfig> {
        self.load_all_with(files, &Mapping::new(), Path::new("."))
    }

    pub fn load_all_with<P: AsRef<Path>>(
        &mut self,
        files: &[P],
        context: &Mapping,
        base_directory: &Path,
    ) -> ConfigResult<ResolvedConfig> {
        let mut merged: Option<ResolvedConfig> = None;
        for file in files {
            let config = self.load_with(file, context, base_directory)?;
            merged = Some(match merged {
                Some(previous) => previous.deep_merge(config),
                None => config,
            });
        }

        merged.ok_or_else(|| ConfigError::FileNotFound("No configuration file given".to_string()))
    }

    fn resolve_file(&mut self, path: &Path, context: &Mapping) -> ConfigResult<ResolvedConfig> {
        tracing::debug!(path = %path.display(), "loading djin file");

        let content = self
            .cache
            .fetch(path, || fs::read_to_string(path))
            .map_err(|e| {
                ConfigError::FileNotFound(format!("File '{}' could not be read: {}", path.display(), e))
            })?;

        let mut document = parse_document(&content, path)?;
        deep_merge_mappings(&mut document, context.clone());

        let version = schema_version(&document, path)?;
        ensure_supported(&version, path)?;

        let directory = path.parent().unwrap_or_else(|| Path::new("."));
        let resolver = IncludeResolver::new(directory, &self.remote_directory);
        let directives = resolver.resolve(document.get("include"))?;
        let included = self.load_includes(&directives)?;

        let (raw_tasks, legacy) = task_section(&document, path)?;
        if legacy {
            self.warnings.deprecate(LEGACY_TASKS_WARNING);
        }

        let mut variables = included
            .as_ref()
            .map(|config| config.variables.clone())
            .unwrap_or_default();
        variables.extend(parse_variables(&document, path)?);

        let locals = self.locals(&variables);
        let tasks = render_mapping(&raw_tasks, &locals, path)?;

        let mut include_directives: Vec<IncludeDirective> = Vec::with_capacity(directives.len());
        for directive in directives {
            if !include_directives.contains(&directive) {
                include_directives.push(directive);
            }
        }
        let (mut all_tasks, mut all_raw_tasks) = match included {
            Some(included) => {
                for directive in included.include_directives {
                    if !include_directives.contains(&directive) {
                        include_directives.push(directive);
                    }
                }
                (included.tasks, included.raw_tasks)
            }
            None => (Mapping::new(), Mapping::new()),
        };
        deep_merge_mappings(&mut all_tasks, tasks);
        deep_merge_mappings(&mut all_raw_tasks, raw_tasks);

        Ok(ResolvedConfig {
            schema_version: version,
            variables,
            tasks: all_tasks,
            raw_tasks: all_raw_tasks,
            include_directives,
        })
    }

    /// Load every present include and merge them in order. Missing remote
    /// includes that were never fetched only produce a warning.
    fn load_includes(
        &mut self,
        directives: &[IncludeDirective],
    ) -> ConfigResult<Option<ResolvedConfig>> {
        let mut merged: Option<ResolvedConfig> = None;

        for directive in directives {
            let skippable = self.skip_broken_remotes && directive.is_remote();
            if directive.missing {
                if !skippable {
                    self.handle_missing(directive)?;
                }
                continue;
            }

            let config =
                match self.load_with(&directive.full_path, &directive.context, Path::new(".")) {
                    Ok(config) => config,
                    Err(e) if skippable => {
                        tracing::debug!(file = %directive.file, error = %e, "skipping remote include");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
            merged = Some(match merged {
                Some(previous) => previous.deep_merge(config),
                None => config,
            });
        }

        Ok(merged)
    }

    fn handle_missing(&mut self, directive: &IncludeDirective) -> ConfigResult<()> {
        match directive.kind() {
            IncludeKind::Local => Err(not_found(&directive.full_path)),
            IncludeKind::Remote => {
                let folder = directive.folder_name().unwrap_or_default();
                if directive.repository_fetched() {
                    return Err(ConfigError::FileNotFound(format!(
                        "File '{}' not found in {}, try running `djin remote-config fetch` again",
                        directive.file, folder
                    )));
                }

                self.warnings.warn(format!(
                    "Missing cache folder {} for {}, run `djin remote-config fetch` to download it",
                    folder,
                    directive.git.as_deref().unwrap_or_default()
                ));
                Ok(())
            }
        }
    }

    /// Environment variables, then declared variables, then `args`/`args?`
    fn locals(&self, variables: &Variables) -> Locals {
        let mut locals = Locals::from_env(&self.env);
        locals.extend(
            variables
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        locals.with_args(&self.args)
    }
}

/// Render every string of a mapping, keys included
fn render_mapping(map: &Mapping, locals: &Locals, path: &Path) -> ConfigResult<Mapping> {
    let mut rendered = Mapping::with_capacity(map.len());
    for (key, value) in map {
        rendered.insert(
            render_value(key, locals, path)?,
            render_value(value, locals, path)?,
        );
    }
    Ok(rendered)
}

fn render_value(value: &Value, locals: &Locals, path: &Path) -> ConfigResult<Value> {
    let rendered = match value {
        Value::String(text) => Value::String(render_text(text, locals, path)?),
        Value::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| render_value(item, locals, path))
                .collect::<ConfigResult<_>>()?,
        ),
        Value::Mapping(map) => Value::Mapping(render_mapping(map, locals, path)?),
        other => other.clone(),
    };
    Ok(rendered)
}

fn render_text(text: &str, locals: &Locals, path: &Path) -> ConfigResult<String> {
    template::render(text, locals).map_err(|e| ConfigError::InvalidConfigFile {
        path: path.to_path_buf(),
        message: format!("invalid template '{}': {}", text, e),
    })
}

fn not_found(path: &Path) -> ConfigError {
    ConfigError::FileNotFound(format!("File '{}' not found", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::template::Local;
    use crate::ui::WarningKind;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn loader(dir: &TempDir) -> ConfigLoader {
        ConfigLoader::new(dir.path().join("remote")).with_env(HashMap::new())
    }

    fn yaml(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    fn header() -> String {
        format!("djin_version: '{}'\n", crate::VERSION)
    }

    #[test]
    fn test_load_simple_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "djin.yml",
            &format!("{}tasks:\n  default:\n    local:\n      run: echo hi\n", header()),
        );

        let config = loader(&dir).load(&path).unwrap();

        assert_eq!(config.schema_version, crate::VERSION);
        assert_eq!(config.tasks, yaml("default:\n  local:\n    run: echo hi"));
        assert_eq!(config.raw_tasks, config.tasks);
        assert!(config.include_directives.is_empty());
    }

    #[test]
    fn test_file_not_found() {
        let dir = TempDir::new().unwrap();
        let result = loader(&dir).load(dir.path().join("nope.yml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_render_with_variables_env_and_args() {
        let dir = TempDir::new().unwrap();
        let path = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}variables:\n  greeting: Hello\n  USER: declared\ntasks:\n  default:\n    local:\n      run: echo {{{{greeting}}}} {{{{USER}}}} {{{{FILES}}}}{{{{#args?}}}} {{{{args}}}}{{{{/args?}}}}\n",
                header()
            ),
        );

        let mut env = HashMap::new();
        env.insert("USER".to_string(), "from-env".to_string());
        env.insert("FILES".to_string(), "a b".to_string());
        let mut loader = ConfigLoader::new(dir.path().join("remote"))
            .with_env(env)
            .with_args(vec!["-a".to_string(), "-b".to_string()]);

        let config = loader.load(&path).unwrap();

        assert_eq!(
            config.tasks,
            yaml("default:\n  local:\n    run: echo Hello declared a b -a -b")
        );
        assert_eq!(
            config.raw_tasks,
            yaml("default:\n  local:\n    run: echo {{greeting}} {{USER}} {{FILES}}{{#args?}} {{args}}{{/args?}}")
        );
        assert_eq!(config.variables.get("greeting"), Some(&Local::from("Hello")));
    }

    #[test]
    fn test_legacy_tasks_warn_once() {
        let dir = TempDir::new().unwrap();
        let legacy = format!("{}_hide: this\ndefault:\n  local:\n    run: echo hi\n", header());
        let first = write(dir.path(), "one.yml", &legacy);
        let second = write(dir.path(), "two.yml", &legacy);

        let mut loader = loader(&dir);
        let config = loader.load_all(&[first, second]).unwrap();

        assert_eq!(config.task_names(), vec!["default"]);
        assert_eq!(loader.warnings().emitted().len(), 1);
        assert_eq!(loader.warnings().emitted()[0].0, WarningKind::Deprecated);
    }

    #[test]
    fn test_missing_version() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "djin.yml", "tasks: {}\n");

        let result = loader(&dir).load(&path);
        assert!(matches!(result, Err(ConfigError::MissingVersion(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "djin.yml", "djin_version: [\n");

        let result = loader(&dir).load(&path);
        assert!(matches!(result, Err(ConfigError::InvalidConfigFile { .. })));
    }

    #[test]
    fn test_local_include_with_context() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "shared/tasks.yml",
            &format!(
                "{}variables:\n  namespace: base\n  image: alpine\ntasks:\n  shared:\n    docker:\n      image: '{{{{image}}}}'\n      run: echo {{{{namespace}}}}\n",
                header()
            ),
        );
        let root = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}include:\n  - file: shared/tasks.yml\n    context:\n      variables:\n        namespace: custom\nvariables:\n  image: ruby\ntasks:\n  own:\n    local:\n      run: echo {{{{image}}}}\n",
                header()
            ),
        );

        let config = loader(&dir).load(&root).unwrap();

        assert_eq!(config.task_names(), vec!["shared", "own"]);
        assert_eq!(
            config.tasks,
            yaml("shared:\n  docker:\n    image: alpine\n    run: echo custom\nown:\n  local:\n    run: echo ruby")
        );
        assert_eq!(config.variables.get("namespace"), Some(&Local::from("custom")));
        assert_eq!(config.variables.get("image"), Some(&Local::from("ruby")));
        assert_eq!(config.include_directives.len(), 1);
    }

    #[test]
    fn test_own_tasks_win_over_included() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "included.yml",
            &format!("{}tasks:\n  test:\n    description: included\n    local:\n      run: echo included\n", header()),
        );
        let root = write(
            dir.path(),
            "djin.yml",
            &format!("{}include:\n  - file: included.yml\ntasks:\n  test:\n    local:\n      run: echo own\n", header()),
        );

        let config = loader(&dir).load(&root).unwrap();

        assert_eq!(
            config.tasks,
            yaml("test:\n  description: included\n  local:\n    run: echo own")
        );
    }

    #[test]
    fn test_missing_local_include_fails() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "djin.yml",
            &format!("{}include:\n  - file: nope.yml\n", header()),
        );

        let result = loader(&dir).load(&root);
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_unfetched_remote_include_warns() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}include:\n  - file: test.yml\n    git: http://gitserver/myrepo.git\n  - file: test.yml\n    git: http://gitserver/myrepo.git\ntasks:\n  own:\n    local:\n      run: echo own\n",
                header()
            ),
        );

        let mut loader = loader(&dir);
        let config = loader.load(&root).unwrap();

        assert_eq!(config.task_names(), vec!["own"]);
        assert_eq!(config.raw_tasks.len(), 1);
        assert_eq!(config.include_directives.len(), 1);
        assert_eq!(loader.warnings().emitted().len(), 1);
        assert!(loader.warnings().emitted()[0].1.contains("myrepo@master"));
    }

    #[test]
    fn test_fetched_remote_without_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("remote/myrepo@master")).unwrap();
        let root = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}include:\n  - file: test.yml\n    git: http://gitserver/myrepo.git\n",
                header()
            ),
        );

        let result = loader(&dir).load(&root);
        match result {
            Err(ConfigError::FileNotFound(message)) => assert!(message.contains("remote-config fetch")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_broken_remote_includes_skipped_on_request() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("remote/empty@master")).unwrap();
        write(
            dir.path(),
            "remote/future@master/tasks.yml",
            "djin_version: '99.0.0'\ntasks: {}\n",
        );
        let root = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}include:\n  - file: tasks.yml\n    git: http://gitserver/empty.git\n  - file: tasks.yml\n    git: http://gitserver/future.git\n  - file: tasks.yml\n    git: http://gitserver/unfetched.git\n",
                header()
            ),
        );

        assert!(loader(&dir).load(&root).is_err());

        let mut loader = loader(&dir).skip_broken_remote_includes();
        let config = loader.load(&root).unwrap();

        assert!(config.tasks.is_empty());
        assert_eq!(config.include_directives.len(), 3);
        assert!(loader.warnings().emitted().is_empty());
    }

    #[test]
    fn test_fetched_remote_include_is_loaded() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "remote/myrepo@v1/tasks/remote.yml",
            &format!("{}include:\n  - file: nested.yml\ntasks:\n  remote:\n    local:\n      run: echo remote\n", header()),
        );
        write(
            dir.path(),
            "remote/myrepo@v1/tasks/nested.yml",
            &format!("{}tasks:\n  nested:\n    local:\n      run: echo nested\n", header()),
        );
        let root = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}include:\n  - file: tasks/remote.yml\n    git: git@github.com:org/myrepo.git\n    version: v1\n",
                header()
            ),
        );

        let config = loader(&dir).load(&root).unwrap();

        assert_eq!(config.task_names(), vec!["nested", "remote"]);
        assert_eq!(config.include_directives.len(), 2);
        assert!(config.include_directives[0].is_remote());
        assert!(!config.include_directives[1].is_remote());
    }

    #[test]
    fn test_circular_include() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "a.yml",
            &format!("{}include:\n  - file: b.yml\n", header()),
        );
        write(
            dir.path(),
            "b.yml",
            &format!("{}include:\n  - file: a.yml\n", header()),
        );

        let result = loader(&dir).load(dir.path().join("a.yml"));
        assert!(matches!(result, Err(ConfigError::CircularInclude(_))));
    }

    #[test]
    fn test_diamond_include_reads_once() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base.yml",
            &format!("{}tasks:\n  base:\n    local:\n      run: echo base\n", header()),
        );
        for name in ["left.yml", "right.yml"] {
            write(
                dir.path(),
                name,
                &format!("{}include:\n  - file: base.yml\n", header()),
            );
        }
        let root = write(
            dir.path(),
            "djin.yml",
            &format!("{}include:\n  - file: left.yml\n  - file: right.yml\n", header()),
        );

        let mut loader = loader(&dir);
        let config = loader.load(&root).unwrap();

        assert_eq!(config.task_names(), vec!["base"]);
        assert_eq!(loader.cache().len(), 4);
    }

    #[test]
    fn test_dynamic_task_names() {
        let dir = TempDir::new().unwrap();
        let root = write(
            dir.path(),
            "djin.yml",
            &format!(
                "{}variables:\n  namespace: 'app:'\ntasks:\n  '{{{{namespace}}}}unit':\n    local:\n      run: echo unit\n",
                header()
            ),
        );

        let config = loader(&dir).load(&root).unwrap();

        assert_eq!(config.task_names(), vec!["app:unit"]);
        assert!(config.raw_tasks.contains_key("{{namespace}}unit"));
    }

    #[test]
    fn test_load_all_left_to_right() {
        let dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = [("one.yml", "one"), ("two.yml", "two"), ("three.yml", "three")]
            .iter()
            .map(|(name, value)| {
                write(
                    dir.path(),
                    name,
                    &format!(
                        "{}variables:\n  last: {}\ntasks:\n  shared:\n    local:\n      run: echo {}\n  {}:\n    local:\n      run: echo {}\n",
                        header(),
                        value,
                        value,
                        value,
                        value
                    ),
                )
            })
            .collect();

        let mut loader = loader(&dir);
        let all = loader.load_all(&files).unwrap();
        let expected = loader
            .load(&files[0])
            .unwrap()
            .deep_merge(loader.load(&files[1]).unwrap())
            .deep_merge(loader.load(&files[2]).unwrap());

        assert_eq!(all, expected);
        assert_eq!(all.task_names(), vec!["shared", "one", "two", "three"]);
        assert_eq!(all.variables.get("last"), Some(&Local::from("three")));
        assert_eq!(all.tasks.get("shared"), Some(&Value::Mapping(yaml("local:\n  run: echo three"))));
    }
}
