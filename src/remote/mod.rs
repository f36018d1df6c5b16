//! Remote include cache
//!
//! Remote includes are git repositories cloned under `~/.djin/remote` by
//! `djin remote-config fetch`. Loading configuration never touches the
//! network; it only reads what was fetched.

pub mod git;
pub mod repository;

pub use git::{GitCli, GitClient};
pub use repository::{default_remote_directory, RemoteConfig, RemoteConfigRepository};
