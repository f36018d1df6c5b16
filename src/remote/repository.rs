//! Local cache of remote include repositories
//!
//! Each remote include lives in `<base>/<repo>@<version>`, a full working
//! copy checked out at the requested version.

use crate::config::include::{folder_name, IncludeDirective};
use crate::error::Result;
use crate::remote::git::GitClient;
use crate::ui;
use directories::BaseDirs;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

/// A remote repository referenced by an include
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub git: String,
    pub version: String,
    pub folder_name: String,
}

impl RemoteConfig {
    pub fn new(git: impl Into<String>, version: impl Into<String>) -> Self {
        let git = git.into();
        let version = version.into();
        let folder_name = folder_name(&git, &version);
        RemoteConfig {
            git,
            version,
            folder_name,
        }
    }

    /// Remote configs of every remote directive, in order
    pub fn from_directives(directives: &[IncludeDirective]) -> Vec<RemoteConfig> {
        directives
            .iter()
            .filter_map(|directive| {
                directive
                    .git
                    .as_ref()
                    .map(|git| RemoteConfig::new(git.clone(), directive.version.clone()))
            })
            .collect()
    }
}

/// `~/.djin/remote`
pub fn default_remote_directory() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".djin")
        .join("remote")
}

/// Fetches and removes the cached copies of remote configs
pub struct RemoteConfigRepository<G: GitClient> {
    remote_configs: Vec<RemoteConfig>,
    base_path: PathBuf,
    git: G,
}

impl<G: GitClient> RemoteConfigRepository<G> {
    pub fn new(remote_configs: Vec<RemoteConfig>, base_path: impl Into<PathBuf>, git: G) -> Self {
        RemoteConfigRepository {
            remote_configs,
            base_path: base_path.into(),
            git,
        }
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    /// Clone missing repositories, update the others and check out the
    /// requested versions. Repositories sharing a folder are handled once.
    pub fn fetch_all(&mut self) -> Result<()> {
        for remote_config in unique_by_folder(&self.remote_configs) {
            let folder = self.base_path.join(&remote_config.folder_name);

            if folder.exists() {
                ui::info(format!(
                    "{} repository already cloned, fetching...",
                    remote_config.folder_name
                ));
                self.git.fetch(&folder)?;
            } else {
                ui::info(format!(
                    "Missing {} repository, cloning in {}",
                    remote_config.folder_name,
                    self.base_path.display()
                ));
                fs::create_dir_all(&self.base_path)?;
                self.git.clone_repo(&remote_config.git, &folder)?;
            }

            ui::info(format!("Checking out to '{}'", remote_config.version));
            self.git.checkout(&folder, &remote_config.version)?;

            let branch = self.git.current_branch(&folder)?;
            if branch.as_deref() == Some(remote_config.version.as_str()) {
                ui::info(format!("Pulling changes for '{}'", remote_config.version));
                self.git.pull(&folder, &remote_config.version)?;
            }

            tracing::debug!(folder = %folder.display(), "remote config ready");
        }

        Ok(())
    }

    /// Remove the folders of the held remote configs
    pub fn clear(&self) -> Result<()> {
        for remote_config in unique_by_folder(&self.remote_configs) {
            let folder = self.base_path.join(&remote_config.folder_name);
            ui::info(format!("Removing {} repository...", remote_config.folder_name));
            if folder.exists() {
                fs::remove_dir_all(&folder)?;
            }
        }
        Ok(())
    }

    /// Remove the whole cache directory
    pub fn clear_all(&self) -> Result<()> {
        ui::info(format!("Removing {}...", self.base_path.display()));
        if self.base_path.exists() {
            fs::remove_dir_all(&self.base_path)?;
        }
        Ok(())
    }
}

fn unique_by_folder(remote_configs: &[RemoteConfig]) -> Vec<RemoteConfig> {
    let mut seen = HashSet::new();
    remote_configs
        .iter()
        .filter(|rc| seen.insert(rc.folder_name.clone()))
        .cloned()
        .collect()
}
