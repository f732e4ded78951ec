//! Configuration-scoped cache namespaces.
//!
//! Everything the pipeline persists lives under one namespace directory:
//!
//! ```text
//! <cache root>/<os>/<variant>/
//! ├── conan/           # isolated package manager home
//! ├── resolved/        # resolution results keyed by fingerprint
//! └── build/<config>/  # generated build graph and native artifacts
//! ```
//!
//! Namespacing by platform and variant keeps debug and release dependency
//! sets apart. Two invocations sharing a namespace must not run concurrently.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::platform::Os;
use crate::core::variant::BuildVariant;
use crate::sources::resolver::ResolvedPackage;
use crate::util::fs::{read_to_string, remove_dir_all_if_exists, write_string};

/// One `(platform, variant)` cache namespace.
#[derive(Debug, Clone)]
pub struct CacheNamespace {
    root: PathBuf,
}

impl CacheNamespace {
    /// Namespace for `os` and `variant` under `cache_root`.
    pub fn new(cache_root: &Path, os: Os, variant: BuildVariant) -> Self {
        CacheNamespace {
            root: cache_root.join(os.as_str()).join(variant.slug()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Package manager home directory.
    pub fn package_manager_home(&self) -> PathBuf {
        self.root.join("conan")
    }

    /// Output directory for one build configuration.
    pub fn build_dir(&self, configuration: &str) -> PathBuf {
        self.root.join("build").join(configuration)
    }

    fn resolved_path(&self, key: &str) -> PathBuf {
        self.root.join("resolved").join(format!("{}.json", key))
    }

    /// Load a cached resolution.
    ///
    /// Entries whose recorded directories no longer exist are ignored, so a
    /// package store wiped from under the cache is reinstalled.
    pub fn load_resolved(&self, key: &str) -> Option<ResolvedPackage> {
        let path = self.resolved_path(key);
        if !path.exists() {
            return None;
        }

        let content = read_to_string(&path).ok()?;
        let resolved: ResolvedPackage = match serde_json::from_str(&content) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        let stale = resolved
            .include_dirs
            .iter()
            .chain(&resolved.library_dirs)
            .chain(&resolved.binary_dirs)
            .any(|dir| !dir.exists());

        if stale {
            tracing::debug!("Cache entry {} is stale", path.display());
            return None;
        }

        Some(resolved)
    }

    /// Record a successful resolution.
    pub fn store_resolved(&self, key: &str, resolved: &ResolvedPackage) -> Result<()> {
        let json = serde_json::to_string_pretty(resolved)
            .context("failed to serialize resolved package")?;
        write_string(&self.resolved_path(key), &json)
    }

    /// Remove the whole namespace.
    pub fn clean(&self) -> Result<()> {
        tracing::info!("Removing {}", self.root.display());
        remove_dir_all_if_exists(&self.root)
    }
}
