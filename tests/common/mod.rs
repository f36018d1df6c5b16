//! Common test utilities

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `djin_version` line accepted by the running engine
pub fn version_header() -> String {
    format!("djin_version: '{}'\n", djin::VERSION)
}

/// Create a temporary directory with a djin.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_file(temp_dir.path(), "djin.yml", content);
    (temp_dir, config_path)
}

/// Write `content` to `dir/name`, creating parent directories
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Environment with a single variable, for deterministic rendering
pub fn env_with(key: &str, value: &str) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(key.to_string(), value.to_string());
    env
}
