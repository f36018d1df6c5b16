//! Main CLI application

use crate::config::{ConfigLoader, DEFAULT_CONFIG_FILE};
use crate::error::{DjinError, ExecutionError};
use crate::remote::{default_remote_directory, GitCli, RemoteConfig, RemoteConfigRepository};
use crate::runner::{Executor, Interpreter, RunContext, SystemShell, Task, TaskRepository};
use crate::ui;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashSet;
use std::path::PathBuf;

const REMOTE_CONFIG: &str = "remote-config";

/// Options evaluated before the configuration is loaded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RootArgs {
    /// Configuration files given with `-f/--file`, in order
    pub files: Vec<PathBuf>,
    /// `-v/--version` given in place of a command
    pub version: bool,
    /// Arguments after `--`, handed to tasks as `{{args}}`
    pub task_args: Vec<String>,
    /// First argument that is not a file option, usually the subcommand
    pub command: Option<String>,
}

impl RootArgs {
    /// Files to load, `djin.yml` when none were given
    pub fn config_files(&self) -> Vec<PathBuf> {
        if self.files.is_empty() {
            vec![PathBuf::from(DEFAULT_CONFIG_FILE)]
        } else {
            self.files.clone()
        }
    }
}

/// Extract root options from the full argument list, program name included
pub fn parse_root_args(args: &[String]) -> RootArgs {
    let (before, after) = match args.iter().position(|arg| arg == "--") {
        Some(index) => (&args[..index], &args[index + 1..]),
        None => (args, &args[args.len()..]),
    };

    let mut root = RootArgs {
        task_args: after.to_vec(),
        ..Default::default()
    };
    let mut first_command = None;

    let mut iter = before.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "-f" || arg == "--file" {
            if let Some(file) = iter.next() {
                root.files.push(PathBuf::from(file));
            }
        } else if let Some(file) = arg.strip_prefix("--file=") {
            root.files.push(PathBuf::from(file));
        } else if let Some(file) = arg.strip_prefix("-f").filter(|file| !file.starts_with('-')) {
            root.files.push(PathBuf::from(file.strip_prefix('=').unwrap_or(file)));
        } else if first_command.is_none() {
            first_command = Some(arg.as_str());
        }
    }

    root.version = matches!(first_command, Some("-v") | Some("--version"));
    root.command = first_command.map(str::to_string);
    root
}

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Compiled tasks
    repository: TaskRepository,
    /// Repositories referenced by remote includes
    remote_configs: Vec<RemoteConfig>,
    remote_directory: PathBuf,
    task_args: Vec<String>,
}

impl App {
    /// Load the configuration files and compile their tasks
    pub fn load(root: &RootArgs, remote_directory: PathBuf) -> Result<Self, DjinError> {
        let mut loader =
            ConfigLoader::new(remote_directory.clone()).with_args(root.task_args.clone());
        let config = loader.load_all(&root.config_files())?;

        let tasks = Interpreter::for_current_dir().interpret(&config)?;
        let repository = TaskRepository::new(tasks);
        let remote_configs = RemoteConfig::from_directives(&config.include_directives);
        let command = build_command(&repository);

        Ok(App {
            command,
            repository,
            remote_configs,
            remote_directory,
            task_args: root.task_args.clone(),
        })
    }

    /// Collect the remote includes without compiling any task
    ///
    /// Remote includes that are missing or fail to load are skipped, so the
    /// `remote-config` commands can repair a stale cache.
    pub fn load_remote_configs(
        root: &RootArgs,
        remote_directory: PathBuf,
    ) -> Result<Self, DjinError> {
        let mut loader = ConfigLoader::new(remote_directory.clone())
            .with_args(root.task_args.clone())
            .skip_broken_remote_includes();
        let config = loader.load_all(&root.config_files())?;

        let repository = TaskRepository::default();
        let command = build_command(&repository);

        Ok(App {
            command,
            repository,
            remote_configs: RemoteConfig::from_directives(&config.include_directives),
            remote_directory,
            task_args: root.task_args.clone(),
        })
    }

    pub fn repository(&self) -> &TaskRepository {
        &self.repository
    }

    /// Run the application with command line arguments
    pub fn run(mut self, args: Vec<String>) -> Result<(), DjinError> {
        let matches = self.command.clone().get_matches_from(args);

        match matches.subcommand() {
            Some((REMOTE_CONFIG, sub_matches)) => self.run_remote_config(sub_matches),
            Some((task_name, _)) => {
                let task = self
                    .repository
                    .find(task_name)
                    .ok_or_else(|| ExecutionError::TaskNotFound(task_name.to_string()))?;
                self.run_tasks(&[task])
            }
            None => {
                // No task specified, show help
                self.command.print_help()?;
                println!();
                Ok(())
            }
        }
    }

    fn run_tasks(&self, tasks: &[&Task]) -> Result<(), DjinError> {
        let context = RunContext::new().with_args(self.task_args.clone());
        let mut executor = Executor::new(&self.repository, SystemShell::new(), context);
        executor.run(tasks)?;
        Ok(())
    }

    fn run_remote_config(&mut self, matches: &ArgMatches) -> Result<(), DjinError> {
        let mut repository = RemoteConfigRepository::new(
            self.remote_configs.clone(),
            self.remote_directory.clone(),
            GitCli::new(),
        );

        match matches.subcommand() {
            Some(("fetch", _)) => repository.fetch_all(),
            Some(("clear", clear_matches)) if clear_matches.get_flag("all") => {
                repository.clear_all()
            }
            Some(("clear", _)) => repository.clear(),
            _ => {
                self.command
                    .find_subcommand_mut(REMOTE_CONFIG)
                    .map(|cmd| cmd.print_help())
                    .transpose()?;
                Ok(())
            }
        }
    }
}

/// Build the clap command with one subcommand per task
fn build_command(repository: &TaskRepository) -> Command {
    let mut cmd = Command::new("djin")
        .about("Declarative task runner for docker, docker-compose and local commands")
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to a djin file, can be repeated (default: djin.yml)")
                .action(ArgAction::Append)
                .global(true),
        )
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Prints Djin Version")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new(REMOTE_CONFIG)
                .about("Manages the cache of remote includes")
                .subcommand(Command::new("fetch").about("Clones or updates every remote include"))
                .subcommand(
                    Command::new("clear")
                        .about("Removes the remote includes of this configuration")
                        .arg(
                            Arg::new("all")
                                .long("all")
                                .help("Removes every cached remote include")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        );

    let mut used: HashSet<String> = HashSet::from([REMOTE_CONFIG.to_string()]);

    // Add subcommands for each task
    for task in repository.all() {
        if !used.insert(task.name.clone()) {
            ui::warning(format!(
                "Task name '{}' is already taken by another command, skipping it",
                task.name
            ));
            continue;
        }

        let aliases: Vec<String> = task
            .aliases
            .iter()
            .filter(|alias| used.insert((*alias).clone()))
            .cloned()
            .collect();

        let task_cmd = Command::new(task.name.clone())
            .about(task.description.clone())
            .visible_aliases(aliases)
            .arg(
                Arg::new("args")
                    .value_name("ARGS")
                    .help("Arguments given to the task as {{args}}")
                    .num_args(0..)
                    .last(true)
                    .allow_hyphen_values(true),
            );

        cmd = cmd.subcommand(task_cmd);
    }

    cmd
}

/// Run the CLI application with the process arguments
pub fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let root = parse_root_args(&args);

    if root.version {
        println!("{}", crate::VERSION);
        return Ok(());
    }

    let remote_directory = default_remote_directory();
    let app = if root.command.as_deref() == Some(REMOTE_CONFIG) {
        App::load_remote_configs(&root, remote_directory)?
    } else {
        App::load(&root, remote_directory)?
    };
    app.run(args)?;
    Ok(())
}
