//! Extforge.toml manifest parsing and schema.
//!
//! The manifest names everything the pipeline needs to build one extension
//! module: the native library's build description, its dependencies, the
//! binding interface, and the placeholder extension supplied by the outer
//! packaging tool.
//!
//! ```toml
//! [package]
//! name = "pytgcalls"
//!
//! [library]
//! name = "libtgvoip"
//! path = "share/libtgvoip"
//!
//! [generator]
//! script = "share/gyp-pytgcalls/gyp_main.py"
//!
//! [bindings]
//! interface = "swig/libtgvoip.i"
//!
//! [extension]
//! name = "_libtgvoip"
//! sources = ["swig/libtgvoip.i"]
//!
//! [[dependencies]]
//! reference = "OpenSSL/latest_1.1.1x@conan/stable"
//! options = { no_zlib = true }
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::reference::{DependencyKind, Requirement};
use crate::util::fs::absolute_path;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "Extforge.toml";

/// Default cache directory, relative to the manifest.
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Host-language package receiving the generated wrapper module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageSection {
    pub name: String,
}

/// The native library target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibrarySection {
    /// Target name inside the build description (e.g. `libtgvoip`)
    pub name: String,

    /// Directory holding the build description
    pub path: PathBuf,

    /// Build description file; defaults to `<name>.gyp`
    #[serde(default)]
    pub description: Option<String>,

    /// Include file passed to the generator; defaults to `<name>.gypi`
    #[serde(default)]
    pub include: Option<String>,
}

impl LibrarySection {
    pub fn description_file(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{}.gyp", self.name))
    }

    pub fn include_file(&self) -> String {
        self.include
            .clone()
            .unwrap_or_else(|| format!("{}.gypi", self.name))
    }
}

/// The build-file generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorSection {
    /// Generator entry script, run with the Python interpreter
    pub script: PathBuf,
}

/// The binding generator input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingsSection {
    /// Interface description file (e.g. `swig/libtgvoip.i`)
    pub interface: PathBuf,
}

/// Placeholder extension description from the outer packaging tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionSection {
    pub name: String,

    /// Source entries; glob patterns are expanded
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Cache location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    package: PackageSection,
    library: LibrarySection,
    generator: GeneratorSection,
    bindings: BindingsSection,
    extension: ExtensionSection,
    #[serde(default)]
    cache: CacheSection,
    #[serde(default)]
    dependencies: Vec<Requirement>,
}

/// A parsed manifest, with paths anchored at its directory.
#[derive(Debug, Clone)]
pub struct Manifest {
    root: PathBuf,
    pub package: PackageSection,
    pub library: LibrarySection,
    pub generator: GeneratorSection,
    pub bindings: BindingsSection,
    pub extension: ExtensionSection,
    pub cache: CacheSection,
    pub dependencies: Vec<Requirement>,
}

impl Manifest {
    /// Load a manifest from disk.
    ///
    /// The root is made absolute, since tools run with the manifest
    /// directory as their working directory.
    pub fn load(path: &Path) -> Result<Self> {
        let path = absolute_path(path)?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;

        Self::parse(&content, &path)
    }

    /// Parse manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let manifest = Manifest {
            root,
            package: raw.package,
            library: raw.library,
            generator: raw.generator,
            bindings: raw.bindings,
            extension: raw.extension,
            cache: raw.cache,
            dependencies: raw.dependencies,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.library.name.is_empty() {
            bail!("[library] name must not be empty");
        }
        if self.extension.name.is_empty() {
            bail!("[extension] name must not be empty");
        }

        for (i, dep) in self.dependencies.iter().enumerate() {
            dep.options
                .validate()
                .with_context(|| format!("in dependency `{}`", dep.reference))?;

            if self.dependencies[..i]
                .iter()
                .any(|other| other.reference.name == dep.reference.name)
            {
                bail!("dependency `{}` is declared twice", dep.reference.name);
            }

            if dep.kind == DependencyKind::Executable && !dep.options.is_empty() {
                bail!(
                    "executable dependency `{}` cannot take install options",
                    dep.reference
                );
            }
        }

        Ok(())
    }

    /// Directory containing the manifest.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a manifest-relative path.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Directory holding the native library's build description.
    pub fn library_dir(&self) -> PathBuf {
        self.path(&self.library.path)
    }

    /// Root of all cache namespaces.
    pub fn cache_root(&self) -> PathBuf {
        match &self.cache.dir {
            Some(dir) => self.path(dir),
            None => self.path(DEFAULT_CACHE_DIR),
        }
    }

    /// Directory receiving the generated wrapper module.
    pub fn package_dir(&self) -> PathBuf {
        self.path(&self.package.name)
    }

    /// Dependencies linked into the extension.
    pub fn library_dependencies(&self) -> impl Iterator<Item = &Requirement> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Library)
    }

    /// Dependencies used as subprocess tools.
    pub fn tool_dependencies(&self) -> impl Iterator<Item = &Requirement> {
        self.dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Executable)
    }
}

/// Find the manifest, starting from `cwd` and searching upward.
pub fn find_manifest(cwd: &Path) -> Result<PathBuf> {
    let mut current = cwd.to_path_buf();
    loop {
        let candidate = current.join(MANIFEST_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !current.pop() {
            bail!(
                "could not find `{}` in `{}` or any parent directory",
                MANIFEST_NAME,
                cwd.display()
            );
        }
    }
}
