//! Test utilities and mocks for extforge unit tests.
//!
//! The external tools the pipeline drives (package manager, build-file
//! generator, ninja, SWIG) are not available in unit tests, so this module
//! provides a recording [`MockPackageManager`] plus on-disk fixtures.
//!
//! # Example
//!
//! ```rust,ignore
//! use extforge::test_support::MockPackageManager;
//!
//! let manager = MockPackageManager::new(tmp.path().join("store"));
//! // hand it to a DependencyResolver, then inspect manager.installs()
//! ```

pub mod fixtures;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::core::reference::Settings;
use crate::sources::manager::{CppInfo, InstallGraph, InstallReport, InstallRequest, InstalledNode, PackageManager};

pub use fixtures::*;

/// One install call as seen by [`MockPackageManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInstall {
    pub reference: String,
    pub build_args: Vec<String>,
    pub options: Vec<String>,
    pub settings: Option<Settings>,
    pub home: PathBuf,
}

/// Package manager that "installs" into a temporary store.
///
/// Each install creates `<store>/<name>/{include,lib,bin}` and reports a
/// single package node whose only library is the lower-cased package name.
#[derive(Debug, Default)]
pub struct MockPackageManager {
    store: PathBuf,
    installs: RefCell<Vec<RecordedInstall>>,
    failing: BTreeSet<String>,
    known_options: BTreeMap<String, Vec<String>>,
}

impl MockPackageManager {
    pub fn new(store: impl Into<PathBuf>) -> Self {
        MockPackageManager {
            store: store.into(),
            ..Default::default()
        }
    }

    /// Make installs of `package` fail.
    pub fn fail_on(mut self, package: &str) -> Self {
        self.failing.insert(package.to_string());
        self
    }

    /// Report `options` as the options `package` declares.
    pub fn with_known_options(mut self, package: &str, options: &[&str]) -> Self {
        self.known_options.insert(
            package.to_string(),
            options.iter().map(|o| o.to_string()).collect(),
        );
        self
    }

    /// Installs recorded so far, in call order.
    pub fn installs(&self) -> Vec<RecordedInstall> {
        self.installs.borrow().clone()
    }
}

impl PackageManager for MockPackageManager {
    fn name(&self) -> &str {
        "mock"
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<InstallReport> {
        let name = &request.reference.name;

        self.installs.borrow_mut().push(RecordedInstall {
            reference: request.reference.to_string(),
            build_args: request.policy.build_args().iter().map(|s| s.to_string()).collect(),
            options: request.options.to_args(name),
            settings: request.settings,
            home: request.home.to_path_buf(),
        });

        if self.failing.contains(name) {
            bail!("ERROR: Package '{}' not resolved: missing recipe", request.reference);
        }

        let folder = self.store.join(name);
        for dir in ["include", "lib", "bin"] {
            std::fs::create_dir_all(folder.join(dir))?;
        }

        let options = self
            .known_options
            .get(name)
            .into_iter()
            .flatten()
            .map(|o| (o.clone(), serde_json::Value::String("False".into())))
            .collect();

        let node = InstalledNode {
            reference: Some(format!("{}#0", request.reference)),
            package_folder: Some(folder),
            options,
            cpp_info: BTreeMap::from([(
                "root".to_string(),
                CppInfo {
                    includedirs: Some(vec![PathBuf::from("include")]),
                    libdirs: Some(vec![PathBuf::from("lib")]),
                    bindirs: Some(vec![PathBuf::from("bin")]),
                    libs: Some(vec![name.to_lowercase()]),
                },
            )]),
        };

        Ok(InstallReport {
            graph: InstallGraph {
                nodes: BTreeMap::from([
                    ("0".to_string(), InstalledNode::default()),
                    ("1".to_string(), node),
                ]),
            },
        })
    }
}
