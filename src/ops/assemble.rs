//! Extension assembly.
//!
//! Merges the outputs of every stage into the description the packaging
//! tool compiles. Directory lists keep their first-seen order because they
//! are search paths; link libraries are a set.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::builder::ninja::ArtifactPaths;
use crate::builder::swig::GeneratedSources;
use crate::core::macros::MacroSet;
use crate::core::manifest::Manifest;
use crate::sources::resolver::ResolvedPackage;
use crate::util::fs::expand_sources;

/// Placeholder extension supplied by the packaging tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseDescriptor {
    pub name: String,
    pub sources: Vec<PathBuf>,
}

impl BaseDescriptor {
    /// Base descriptor from the manifest's `[extension]` section, with
    /// source globs expanded and paths anchored at the manifest.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self> {
        let sources = expand_sources(manifest.root(), &manifest.extension.sources)?
            .into_iter()
            .map(|s| manifest.path(s))
            .collect();

        Ok(BaseDescriptor {
            name: manifest.extension.name.clone(),
            sources,
        })
    }
}

/// The compilable description of the extension module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub library_dirs: Vec<PathBuf>,
    pub libraries: BTreeSet<String>,
    pub define_macros: MacroSet,
    pub swig_opts: Vec<String>,
    /// Generated host-language module shipped next to the extension
    pub wrapper_module: PathBuf,
}

/// Merge every stage's output into the final descriptor.
///
/// Interface sources in the base list are replaced by the generated glue
/// source, since the compiler consumes the glue rather than the interface.
pub fn assemble(
    base: &BaseDescriptor,
    resolved: &[ResolvedPackage],
    artifacts: &ArtifactPaths,
    extra_libraries: &[String],
    macros: &MacroSet,
    generated: &GeneratedSources,
) -> ExtensionDescriptor {
    let mut sources = Vec::new();
    let mut glue_added = false;
    for source in &base.sources {
        if is_interface(source) {
            if !glue_added {
                sources.push(generated.glue_source.clone());
                glue_added = true;
            }
        } else {
            push_unique(&mut sources, source);
        }
    }
    if !glue_added {
        sources.push(generated.glue_source.clone());
    }

    let mut include_dirs = Vec::new();
    let mut library_dirs = Vec::new();
    let mut libraries = BTreeSet::new();
    for package in resolved {
        for dir in &package.include_dirs {
            push_unique(&mut include_dirs, dir);
        }
        for dir in &package.library_dirs {
            push_unique(&mut library_dirs, dir);
        }
        libraries.extend(package.libraries.iter().cloned());
    }

    push_unique(&mut library_dirs, &artifacts.library_dir);
    libraries.extend(extra_libraries.iter().cloned());
    libraries.insert(artifacts.link_name.clone());

    ExtensionDescriptor {
        name: base.name.clone(),
        sources,
        include_dirs,
        library_dirs,
        libraries,
        define_macros: macros.clone(),
        swig_opts: generated.flags.clone(),
        wrapper_module: generated.wrapper_module.clone(),
    }
}

fn is_interface(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "i")
}

fn push_unique(list: &mut Vec<PathBuf>, path: &Path) {
    if !list.iter().any(|p| p == path) {
        list.push(path.to_path_buf());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::macros::Define;
    use std::collections::BTreeMap;

    fn package(reference: &str, root: &str, libs: &[&str]) -> ResolvedPackage {
        ResolvedPackage {
            reference: reference.into(),
            include_dirs: vec![PathBuf::from(root).join("include")],
            library_dirs: vec![PathBuf::from(root).join("lib"), PathBuf::from("/shared/lib")],
            binary_dirs: Vec::new(),
            libraries: libs.iter().map(|s| s.to_string()).collect(),
            env: BTreeMap::new(),
        }
    }

    fn generated() -> GeneratedSources {
        GeneratedSources {
            wrapper_module: PathBuf::from("/p/pytgcalls/libtgvoip.py"),
            glue_source: PathBuf::from("/p/swig/libtgvoip_wrap.cpp"),
            flags: vec!["-c++".into(), "-python".into(), "-py3".into()],
        }
    }

    fn artifacts() -> ArtifactPaths {
        ArtifactPaths {
            library_dir: PathBuf::from("/p/cache/linux/release/build/Release"),
            library_files: vec![],
            link_name: "tgvoip".into(),
        }
    }

    fn base() -> BaseDescriptor {
        BaseDescriptor {
            name: "_libtgvoip".into(),
            sources: vec![PathBuf::from("/p/swig/libtgvoip.i")],
        }
    }

    #[test]
    fn test_shared_library_appears_once() {
        let resolved = [
            package("OpenSSL/latest_1.1.1x@conan/stable", "/deps/openssl", &["ssl", "crypto"]),
            package("opus/[~=1.2.1]@bincrafters/stable", "/deps/opus", &["opus", "ssl"]),
        ];

        let descriptor = assemble(
            &base(),
            &resolved,
            &artifacts(),
            &["ssl".to_string()],
            &MacroSet::new(),
            &generated(),
        );

        assert_eq!(descriptor.libraries.iter().filter(|l| *l == "ssl").count(), 1);
        assert_eq!(
            descriptor.libraries.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["crypto", "opus", "ssl", "tgvoip"]
        );
    }

    #[test]
    fn test_directories_keep_search_order() {
        let resolved = [
            package("a/1.0", "/deps/a", &[]),
            package("b/1.0", "/deps/b", &[]),
        ];

        let descriptor = assemble(&base(), &resolved, &artifacts(), &[], &MacroSet::new(), &generated());

        assert_eq!(
            descriptor.include_dirs,
            vec![PathBuf::from("/deps/a/include"), PathBuf::from("/deps/b/include")]
        );
        assert_eq!(
            descriptor.library_dirs,
            vec![
                PathBuf::from("/deps/a/lib"),
                PathBuf::from("/shared/lib"),
                PathBuf::from("/deps/b/lib"),
                PathBuf::from("/p/cache/linux/release/build/Release"),
            ]
        );
    }

    #[test]
    fn test_interface_replaced_by_glue() {
        let mut base = base();
        base.sources.push(PathBuf::from("/p/src/callbacks.cpp"));

        let descriptor = assemble(&base, &[], &artifacts(), &[], &MacroSet::new(), &generated());

        assert_eq!(
            descriptor.sources,
            vec![
                PathBuf::from("/p/swig/libtgvoip_wrap.cpp"),
                PathBuf::from("/p/src/callbacks.cpp"),
            ]
        );
        assert_eq!(descriptor.swig_opts, vec!["-c++", "-python", "-py3"]);
    }

    #[test]
    fn test_descriptor_json() {
        let macros: MacroSet = [Define::flag("HAVE_X"), Define::key_value("VER", "2")]
            .into_iter()
            .collect();
        let descriptor = assemble(&base(), &[], &artifacts(), &[], &macros, &generated());

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json["name"], "_libtgvoip");
        assert_eq!(
            json["define_macros"],
            serde_json::json!([{"name": "HAVE_X"}, {"name": "VER", "value": "2"}])
        );
        assert_eq!(json["libraries"], serde_json::json!(["tgvoip"]));
    }
}
