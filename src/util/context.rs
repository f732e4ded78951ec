//! Global context for extforge operations.
//!
//! Provides centralized access to configuration, paths, and environment.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::manifest::find_manifest;
use crate::util::config::{load_config, Config};

/// Project directories for extforge
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "extforge", "extforge"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Directory holding the global config file
    config_home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Self::with_cwd(cwd)
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let config_home = match PROJECT_DIRS.as_ref() {
            Some(dirs) => dirs.config_dir().to_path_buf(),
            None => directories::BaseDirs::new()
                .map(|b| b.home_dir().join(".extforge"))
                .unwrap_or_else(|| PathBuf::from(".extforge")),
        };

        Ok(GlobalContext {
            cwd,
            config_home,
        })
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_home.join("config.toml")
    }

    /// Get the project configuration file path.
    pub fn project_config_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(".extforge").join("config.toml")
    }

    /// Load global + project configuration.
    pub fn load_config(&self, project_root: &Path) -> Config {
        load_config(&self.config_path(), &self.project_config_path(project_root))
    }

    /// Find the manifest starting from cwd and searching upward.
    pub fn find_manifest(&self) -> Result<PathBuf> {
        find_manifest(&self.cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let ctx = GlobalContext::new().unwrap();
        assert!(ctx.cwd().is_absolute());
        assert!(ctx.config_path().ends_with("config.toml"));
    }

    #[test]
    fn test_project_config_overrides() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();

        let project_config = ctx.project_config_path(tmp.path());
        std::fs::create_dir_all(project_config.parent().unwrap()).unwrap();
        std::fs::write(&project_config, "[tools]\nninja = \"/opt/ninja\"\n").unwrap();

        let config = ctx.load_config(tmp.path());
        assert_eq!(config.tools.ninja, Some(PathBuf::from("/opt/ninja")));
    }
}
