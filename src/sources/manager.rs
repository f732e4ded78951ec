//! The package manager seam.
//!
//! Resolution talks to the package manager through [`PackageManager`], so the
//! resolver's policy (build-from-source routing, caching, option checking)
//! is independent of the CLI that actually installs packages.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::reference::{PackageOptions, PackageReference, Settings};
use crate::core::variant::BuildPolicy;

/// One install operation.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
    pub reference: &'a PackageReference,
    pub options: &'a PackageOptions,
    /// `None` for executable references
    pub settings: Option<Settings>,
    pub policy: BuildPolicy,
    /// Isolated package manager home inside the cache namespace
    pub home: &'a Path,
}

/// Installs packages.
pub trait PackageManager {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Install a reference (and its requirements) and report what was installed.
    fn install(&self, request: &InstallRequest<'_>) -> Result<InstallReport>;
}

/// Structured install output: the installed dependency graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    pub graph: InstallGraph,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallGraph {
    /// Nodes keyed by id; `"0"` is the consumer
    #[serde(default)]
    pub nodes: BTreeMap<String, InstalledNode>,
}

/// One installed package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstalledNode {
    /// Full reference, possibly with a `#revision` suffix
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,

    #[serde(default)]
    pub package_folder: Option<PathBuf>,

    /// Effective options of the package, as the package manager reports them
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,

    /// Usage info keyed by component; `"root"` aggregates the package
    #[serde(default)]
    pub cpp_info: BTreeMap<String, CppInfo>,
}

impl InstalledNode {
    /// Package name from the reference.
    pub fn package_name(&self) -> Option<&str> {
        let reference = self.reference.as_deref()?;
        let name = reference.split('/').next()?;
        (!name.is_empty()).then_some(name)
    }

    /// Aggregated usage info.
    pub fn root_info(&self) -> Option<&CppInfo> {
        self.cpp_info.get("root")
    }
}

/// Usage info of a package; directories may be relative to the package folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CppInfo {
    #[serde(default)]
    pub includedirs: Option<Vec<PathBuf>>,

    #[serde(default)]
    pub libdirs: Option<Vec<PathBuf>>,

    #[serde(default)]
    pub bindirs: Option<Vec<PathBuf>>,

    #[serde(default)]
    pub libs: Option<Vec<String>>,
}
