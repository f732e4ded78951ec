//! Dependency resolution.
//!
//! Turns declared [`Requirement`]s into the include/library/binary directories,
//! link names, and environment needed to build against them. Linkable
//! libraries and executable tools are resolved through separate entry points
//! and return different shapes, so tooling never leaks into the link line.
//!
//! The effective build policy comes from the target settings: a `Debug`
//! build type always builds dependencies from source.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::PipelineError;
use crate::core::reference::{DependencyKind, PackageOptions, PackageReference, Requirement, Settings};
use crate::core::variant::BuildPolicy;
use crate::sources::cache::CacheNamespace;
use crate::sources::manager::{InstallReport, InstallRequest, InstalledNode, PackageManager};
use crate::util::hash::Fingerprint;
use crate::util::shell::{format_duration, Shell, Status};

/// A linkable dependency after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    /// The reference as requested
    pub reference: String,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub binary_dirs: Vec<PathBuf>,
    pub libraries: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// An executable tool after resolution. Carries no link information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableTool {
    pub reference: String,
    pub env: BTreeMap<String, String>,
    pub binary_dirs: Vec<PathBuf>,
}

/// Resolves requirements through a [`PackageManager`] into one cache namespace.
pub struct DependencyResolver<'a, M> {
    manager: M,
    namespace: &'a CacheNamespace,
    settings: Settings,
    default_policy: BuildPolicy,
    shell: &'a Shell,
}

impl<'a, M: PackageManager> DependencyResolver<'a, M> {
    pub fn new(
        manager: M,
        namespace: &'a CacheNamespace,
        settings: Settings,
        default_policy: BuildPolicy,
        shell: &'a Shell,
    ) -> Self {
        DependencyResolver {
            manager,
            namespace,
            settings,
            default_policy,
            shell,
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Policy applied to linkable dependencies.
    pub fn library_policy(&self) -> BuildPolicy {
        self.settings.build_type.build_policy(self.default_policy)
    }

    /// Resolve linkable dependencies, in declaration order.
    ///
    /// Fails on the first reference that cannot be resolved; no partial set
    /// is returned.
    pub fn resolve(&self, requirements: &[Requirement]) -> Result<Vec<ResolvedPackage>> {
        requirements
            .iter()
            .map(|req| {
                if req.kind == DependencyKind::Executable {
                    return Err(resolution_error(
                        &req.reference,
                        "is an executable dependency and has no link information",
                    ));
                }
                self.resolve_one(req, Some(self.settings), self.library_policy())
            })
            .collect()
    }

    /// Resolve a tool invoked as a subprocess.
    ///
    /// Tools are installed without target settings, matching how the host
    /// runs them.
    pub fn resolve_executable(&self, requirement: &Requirement) -> Result<ExecutableTool> {
        if requirement.kind != DependencyKind::Executable {
            return Err(resolution_error(
                &requirement.reference,
                "is a library dependency; resolve it with its link information",
            ));
        }

        let resolved = self.resolve_one(requirement, None, self.default_policy)?;
        Ok(ExecutableTool {
            reference: resolved.reference,
            env: resolved.env,
            binary_dirs: resolved.binary_dirs,
        })
    }

    fn resolve_one(
        &self,
        requirement: &Requirement,
        settings: Option<Settings>,
        policy: BuildPolicy,
    ) -> Result<ResolvedPackage> {
        let reference = &requirement.reference;
        let key = cache_key(requirement, settings, policy);

        if let Some(cached) = self.namespace.load_resolved(&key) {
            tracing::debug!("Using cached resolution of {} ({})", reference, key);
            self.shell.status(Status::Fresh, reference);
            return Ok(cached);
        }

        let home = self.namespace.package_manager_home();
        let request = InstallRequest {
            reference,
            options: &requirement.options,
            settings,
            policy,
            home: &home,
        };

        tracing::debug!(
            "Installing {} with {} (build: {})",
            reference,
            self.manager.name(),
            policy.build_args().join(", ")
        );

        let spinner = self.shell.spinner(Status::Resolving, reference);
        let report = self
            .manager
            .install(&request)
            .map_err(|e| resolution_error(reference, format!("{:#}", e)))?;
        let elapsed = spinner.finish();
        tracing::debug!("Installed {} in {}", reference, format_duration(elapsed));

        let resolved = collect(reference, &requirement.options, &report)
            .map_err(|e| resolution_error(reference, format!("{:#}", e)))?;

        if let Err(e) = self.namespace.store_resolved(&key, &resolved) {
            tracing::warn!("Failed to cache resolution of {}: {:#}", reference, e);
        }

        Ok(resolved)
    }
}

fn resolution_error(reference: &PackageReference, message: impl Into<String>) -> anyhow::Error {
    PipelineError::DependencyResolution {
        reference: reference.to_string(),
        message: message.into(),
    }
    .into()
}

fn cache_key(requirement: &Requirement, settings: Option<Settings>, policy: BuildPolicy) -> String {
    let mut fp = Fingerprint::new();
    fp.update_str(&requirement.reference.to_string());
    fp.update_strs(requirement.options.to_args(&requirement.reference.name));
    fp.update_strs(settings.map(|s| s.to_args()).unwrap_or_default());
    fp.update_strs(policy.build_args());
    fp.finish_short()
}

/// Build a [`ResolvedPackage`] from an install report.
///
/// The requested package and everything it pulled in contribute, in node
/// order, so transitive include and library dirs are searched after the
/// package's own.
fn collect(
    reference: &PackageReference,
    options: &PackageOptions,
    report: &InstallReport,
) -> Result<ResolvedPackage> {
    let mut nodes: Vec<(u64, &InstalledNode)> = report
        .graph
        .nodes
        .iter()
        .filter(|(_, node)| node.package_folder.is_some())
        .map(|(id, node)| (id.parse().unwrap_or(u64::MAX), node))
        .collect();
    nodes.sort_by_key(|(id, _)| *id);

    let Some(position) = nodes
        .iter()
        .position(|(_, node)| node.package_name() == Some(reference.name.as_str()))
    else {
        bail!("package manager did not report `{}` as installed", reference.name);
    };

    let (_, target) = nodes.remove(position);
    check_options(target, options)?;

    let mut resolved = ResolvedPackage {
        reference: reference.to_string(),
        include_dirs: Vec::new(),
        library_dirs: Vec::new(),
        binary_dirs: Vec::new(),
        libraries: Vec::new(),
        env: BTreeMap::new(),
    };

    for node in std::iter::once(target).chain(nodes.into_iter().map(|(_, n)| n)) {
        add_node(&mut resolved, node);
    }

    if !resolved.binary_dirs.is_empty() {
        let path = std::env::join_paths(&resolved.binary_dirs)?;
        resolved
            .env
            .insert("PATH".to_string(), path.to_string_lossy().into_owned());
    }

    Ok(resolved)
}

fn check_options(node: &InstalledNode, options: &PackageOptions) -> Result<()> {
    // Recipes without options report nothing to check against.
    if node.options.is_empty() {
        return Ok(());
    }

    for name in options.names() {
        if !node.options.contains_key(name) {
            let known: Vec<&str> = node.options.keys().map(String::as_str).collect();
            bail!("unknown option `{}` (known options: {})", name, known.join(", "));
        }
    }
    Ok(())
}

fn add_node(resolved: &mut ResolvedPackage, node: &InstalledNode) {
    let Some(folder) = node.package_folder.as_deref() else {
        return;
    };

    if let Some(name) = node.package_name() {
        let env_name = PackageReference::env_name_of(name);
        resolved
            .env
            .entry(format!("{}_ROOT", env_name))
            .or_insert_with(|| folder.to_string_lossy().into_owned());
    }

    let Some(info) = node.root_info() else {
        return;
    };

    extend_dirs(&mut resolved.include_dirs, folder, info.includedirs.as_deref());
    extend_dirs(&mut resolved.library_dirs, folder, info.libdirs.as_deref());
    extend_dirs(&mut resolved.binary_dirs, folder, info.bindirs.as_deref());

    for lib in info.libs.iter().flatten() {
        if !resolved.libraries.contains(lib) {
            resolved.libraries.push(lib.clone());
        }
    }
}

fn extend_dirs(dirs: &mut Vec<PathBuf>, folder: &Path, entries: Option<&[PathBuf]>) {
    for entry in entries.unwrap_or_default() {
        let dir = folder.join(entry);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
}
