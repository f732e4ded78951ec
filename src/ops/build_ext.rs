//! Implementation of `extforge build`.
//!
//! The pipeline is strictly sequential and fails fast:
//!
//! 1. resolve dependencies (libraries, then tools)
//! 2. generate the build graph and read back the target's macros
//! 3. compile the native library
//! 4. merge platform macros and generate bindings
//! 5. assemble the extension descriptor

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::gyp::{BuildFileGenerator, GeneratorDefines};
use crate::builder::ninja::NinjaExecutor;
use crate::builder::swig::BindingGenerator;
use crate::core::macros::MacroSet;
use crate::core::manifest::Manifest;
use crate::core::platform::Platform;
use crate::core::reference::{Arch, Settings};
use crate::core::variant::{BuildPolicy, BuildVariant};
use crate::ops::assemble::{assemble, BaseDescriptor, ExtensionDescriptor};
use crate::ops::clean::cache_root;
use crate::sources::cache::CacheNamespace;
use crate::sources::conan::ConanCli;
use crate::sources::manager::PackageManager;
use crate::sources::resolver::{DependencyResolver, ExecutableTool, ResolvedPackage};
use crate::util::config::Config;
use crate::util::process::find_python;
use crate::util::shell::{format_duration, Shell, Status};

/// Options for one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub variant: BuildVariant,
    pub platform: Platform,
    /// Overrides the configured release build policy
    pub build_policy: Option<BuildPolicy>,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub descriptor: ExtensionDescriptor,
    pub namespace: PathBuf,
    pub graph_fingerprint: String,
}

/// Merge platform macros into extracted ones; extracted values win.
pub fn merge_platform_macros(extracted: &MacroSet, platform: &Platform) -> MacroSet {
    let mut merged = extracted.clone();
    merged.append_missing(&platform.macros());
    merged
}

/// Cache namespace for a run.
pub fn namespace_for(manifest: &Manifest, config: &Config, opts: &BuildOptions) -> CacheNamespace {
    CacheNamespace::new(&cache_root(manifest, config), opts.platform.os, opts.variant)
}

/// Run the whole pipeline with the conan package manager.
pub fn build(manifest: &Manifest, config: &Config, opts: &BuildOptions, shell: &Shell) -> Result<BuildResult> {
    let manager = ConanCli::new(config.tools.conan.clone())?;
    build_with(manager, manifest, config, opts, shell)
}

/// Run the whole pipeline with a given package manager.
pub fn build_with<M: PackageManager>(
    manager: M,
    manifest: &Manifest,
    config: &Config,
    opts: &BuildOptions,
    shell: &Shell,
) -> Result<BuildResult> {
    let start = std::time::Instant::now();
    let variant = opts.variant;
    let configuration = variant.configuration_name();
    let default_policy = match opts.build_policy {
        Some(policy) => policy,
        None => config.build_policy()?,
    };

    tracing::info!(
        "Building {} for {} ({}, {})",
        manifest.extension.name,
        opts.platform,
        variant,
        configuration
    );

    let namespace = namespace_for(manifest, config, opts);
    let arch = if opts.platform == Platform::host() {
        Arch::host()
    } else {
        Arch::from_word_width(opts.platform.word_width)
    };
    let settings = Settings::new(variant.build_type(), arch);

    // 1. Dependencies
    let resolver = DependencyResolver::new(manager, &namespace, settings, default_policy, shell);
    let libraries: Vec<_> = manifest.library_dependencies().cloned().collect();
    let resolved = resolver.resolve(&libraries)?;
    let tools = manifest
        .tool_dependencies()
        .map(|req| resolver.resolve_executable(req))
        .collect::<Result<Vec<ExecutableTool>>>()?;

    let include_dirs = include_dirs(&resolved);
    let tool_dirs: Vec<PathBuf> = tools.iter().flat_map(|t| t.binary_dirs.clone()).collect();

    // 2. Build graph and macros
    let python = match &config.tools.python {
        Some(p) => p.clone(),
        None => find_python().context(
            "Python 3 not found\n\
             \n\
             The build-file generator is a Python script.\n\
             Set `PYTHON` or [tools] python in the extforge config.",
        )?,
    };
    let output_root = namespace.root().join("build");
    let build_dir = namespace.build_dir(configuration);
    let defines = GeneratorDefines::standard(&include_dirs, &build_dir, &opts.platform);
    let generator = BuildFileGenerator::new(manifest, python, opts.platform, shell)
        .tool_dirs(tool_dirs.clone());
    let generated = generator.generate(defines, configuration, &output_root)?;

    // 3. Native library
    let executor = NinjaExecutor::new(
        config.tools.ninja.clone(),
        tool_dirs,
        opts.platform,
        manifest.library.name.clone(),
        shell,
    )?;
    let artifacts = executor.build(&generated.graph)?;

    // 4. Bindings
    let macros = merge_platform_macros(&generated.macros, &opts.platform);
    let swig = BindingGenerator::new(config.tools.swig.clone(), shell)?;
    let sources = swig.invoke(
        &manifest.path(&manifest.bindings.interface),
        &include_dirs,
        &macros,
        &manifest.package_dir(),
        variant.debug_interpreter(),
    )?;

    // 5. Descriptor
    shell.status(Status::Assembling, &manifest.extension.name);
    let base = BaseDescriptor::from_manifest(manifest)?;
    let descriptor = assemble(
        &base,
        &resolved,
        &artifacts,
        &generated.libraries,
        &macros,
        &sources,
    );

    shell.status(
        Status::Finished,
        format!(
            "extension `{}` ({}) in {}",
            descriptor.name,
            variant,
            format_duration(start.elapsed())
        ),
    );

    Ok(BuildResult {
        descriptor,
        namespace: namespace.root().to_path_buf(),
        graph_fingerprint: generated.graph.fingerprint,
    })
}

/// Include directories of all packages, first occurrence first.
fn include_dirs(resolved: &[ResolvedPackage]) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();
    for dir in resolved.iter().flat_map(|p| &p.include_dirs) {
        if !dirs.contains(dir) {
            dirs.push(dir.clone());
        }
    }
    dirs
}
