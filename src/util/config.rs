//! Configuration file support for extforge.
//!
//! Two configuration file locations are read:
//! - Global: `<config dir>/extforge/config.toml` - User-wide defaults
//! - Project: `.extforge/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::variant::BuildPolicy;

/// extforge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External tool locations
    pub tools: ToolPaths,

    /// Dependency resolution settings
    pub resolve: ResolveConfig,
}

/// Explicit paths to external tools. Unset tools are looked up on PATH.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    /// Python interpreter running the build-file generator
    pub python: Option<PathBuf>,

    /// Package manager CLI
    pub conan: Option<PathBuf>,

    /// Incremental build executor
    pub ninja: Option<PathBuf>,

    /// Binding generator
    pub swig: Option<PathBuf>,
}

/// Dependency resolution settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Build policy for release variants (`prebuilt-only`, `missing`, `from-source`)
    pub build_policy: Option<String>,

    /// Override for the cache root directory
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.tools.python.is_some() {
            self.tools.python = other.tools.python;
        }
        if other.tools.conan.is_some() {
            self.tools.conan = other.tools.conan;
        }
        if other.tools.ninja.is_some() {
            self.tools.ninja = other.tools.ninja;
        }
        if other.tools.swig.is_some() {
            self.tools.swig = other.tools.swig;
        }

        if other.resolve.build_policy.is_some() {
            self.resolve.build_policy = other.resolve.build_policy;
        }
        if other.resolve.cache_dir.is_some() {
            self.resolve.cache_dir = other.resolve.cache_dir;
        }
    }

    /// Parse the configured release build policy.
    pub fn build_policy(&self) -> Result<BuildPolicy> {
        match &self.resolve.build_policy {
            Some(s) => s
                .parse::<BuildPolicy>()
                .map_err(|e| anyhow::anyhow!("invalid [resolve] build_policy: {}", e)),
            None => Ok(BuildPolicy::default()),
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.extforge/config.toml)
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
