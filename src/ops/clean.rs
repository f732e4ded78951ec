//! Implementation of `extforge clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::manifest::Manifest;
use crate::core::platform::Os;
use crate::core::variant::BuildVariant;
use crate::sources::cache::CacheNamespace;
use crate::util::config::Config;
use crate::util::fs::remove_dir_all_if_exists;

/// Which part of the cache to remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanScope {
    /// One `(os, variant)` namespace
    Namespace(Os, BuildVariant),
    /// The whole cache root
    All,
}

/// Cache root in effect for a project.
pub fn cache_root(manifest: &Manifest, config: &Config) -> PathBuf {
    match &config.resolve.cache_dir {
        Some(dir) => manifest.path(dir),
        None => manifest.cache_root(),
    }
}

/// Remove cached state. Returns the removed directory, or `None` if there
/// was nothing to remove.
pub fn clean(manifest: &Manifest, config: &Config, scope: CleanScope) -> Result<Option<PathBuf>> {
    let root = cache_root(manifest, config);

    let target = match scope {
        CleanScope::All => {
            tracing::info!("Removing {}", root.display());
            root
        }
        CleanScope::Namespace(os, variant) => {
            let namespace = CacheNamespace::new(&root, os, variant);
            if !namespace.root().exists() {
                return Ok(None);
            }
            namespace.clean()?;
            return Ok(Some(namespace.root().to_path_buf()));
        }
    };

    if !target.exists() {
        return Ok(None);
    }
    remove_dir_all_if_exists(&target)?;
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::write_project;
    use tempfile::TempDir;

    #[test]
    fn test_clean_one_namespace() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_project(tmp.path())).unwrap();
        let config = Config::default();
        let cache = tmp.path().join("cache/linux");
        std::fs::create_dir_all(cache.join("release/conan")).unwrap();
        std::fs::create_dir_all(cache.join("debug-1/conan")).unwrap();

        let removed = clean(
            &manifest,
            &config,
            CleanScope::Namespace(Os::Linux, BuildVariant::Release),
        )
        .unwrap();

        assert_eq!(removed, Some(cache.join("release")));
        assert!(!cache.join("release").exists());
        assert!(cache.join("debug-1").exists());
    }

    #[test]
    fn test_clean_all_and_missing() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_project(tmp.path())).unwrap();
        let config = Config::default();

        assert_eq!(clean(&manifest, &config, CleanScope::All).unwrap(), None);

        std::fs::create_dir_all(tmp.path().join("cache/windows/debug-0")).unwrap();
        let removed = clean(&manifest, &config, CleanScope::All).unwrap();
        assert_eq!(removed, Some(tmp.path().join("cache")));
        assert!(!tmp.path().join("cache").exists());
    }
}
