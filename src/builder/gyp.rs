//! Build-file generation.
//!
//! The generator runs twice over the same build description: once with the
//! ninja backend to produce the action graph, and once with the dump backend
//! so the resolved define table can be read back. Callers only see the
//! combined result, [`GeneratedBuild`].
//!
//! Generator variables are passed through `GYP_DEFINES` on the child
//! process only:
//!
//! ```text
//! GYP_DEFINES=dynamic_msvc_runtime=1 conan_include_dirs='"/a/include" "/b/include"' ...
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::dump;
use crate::core::error::PipelineError;
use crate::core::macros::MacroSet;
use crate::core::manifest::Manifest;
use crate::core::platform::Platform;
use crate::util::fs::{read_to_string, relative_path, write_string};
use crate::util::hash::{sha256_file, Fingerprint};
use crate::util::process::{combined_output, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Environment variable the generator reads its variables from.
pub const DEFINES_ENV: &str = "GYP_DEFINES";

/// Name of the ninja graph file inside a build directory.
pub const GRAPH_FILE: &str = "build.ninja";

const STAMP_FILE: &str = ".extforge-graph.json";

/// Value of one generator variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineValue {
    Int(i64),
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for DefineValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineValue::Int(i) => write!(f, "{}", i),
            DefineValue::Str(s) => write!(f, "\"{}\"", s),
            // Lists are one shell-quoted word of individually quoted items.
            DefineValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|s| format!("\"{}\"", s)).collect();
                write!(f, "'{}'", quoted.join(" "))
            }
        }
    }
}

/// Ordered generator variables for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorDefines {
    entries: Vec<(String, DefineValue)>,
}

impl GeneratorDefines {
    pub fn new() -> Self {
        GeneratorDefines::default()
    }

    /// The variables the native library's build description expects.
    pub fn standard(include_dirs: &[PathBuf], build_output_dir: &Path, platform: &Platform) -> Self {
        GeneratorDefines::new()
            .int("dynamic_msvc_runtime", 1)
            .list(
                "conan_include_dirs",
                include_dirs.iter().map(|d| d.to_string_lossy().into_owned()),
            )
            .string("build_output_dir", build_output_dir.to_string_lossy())
            .string("build_msvc_platform", platform.msvc_platform())
    }

    pub fn int(self, key: impl Into<String>, value: i64) -> Self {
        self.set(key.into(), DefineValue::Int(value))
    }

    pub fn string(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key.into(), DefineValue::Str(value.into()))
    }

    /// A list variable. A single item renders like a plain string.
    pub fn list(self, key: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        let mut values: Vec<String> = values.into_iter().collect();
        let value = if values.len() == 1 {
            DefineValue::Str(values.remove(0))
        } else {
            DefineValue::List(values)
        };
        self.set(key.into(), value)
    }

    fn set(mut self, key: String, value: DefineValue) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&DefineValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Render as the `GYP_DEFINES` value.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Generator backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorFormat {
    /// Incremental build graph
    Ninja,
    /// Human-readable resolved description
    Gypd,
}

impl GeneratorFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorFormat::Ninja => "ninja",
            GeneratorFormat::Gypd => "gypd",
        }
    }
}

/// A generated build graph for one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildGraphHandle {
    pub configuration: String,
    pub build_dir: PathBuf,
    pub graph_file: PathBuf,
    /// sha256 of the graph file
    pub fingerprint: String,
}

/// Everything one generation produces.
#[derive(Debug, Clone)]
pub struct GeneratedBuild {
    pub graph: BuildGraphHandle,
    /// Defines the compiler will use for the target
    pub macros: MacroSet,
    /// Extra link libraries of the target
    pub libraries: Vec<String>,
    pub dump_file: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct GraphStamp {
    inputs: String,
    graph: String,
}

/// Runs the build-file generator over the native library's description.
pub struct BuildFileGenerator<'a> {
    python: PathBuf,
    script: PathBuf,
    root: PathBuf,
    library_dir: PathBuf,
    target: String,
    description: PathBuf,
    include: PathBuf,
    platform: Platform,
    tool_dirs: Vec<PathBuf>,
    shell: &'a Shell,
}

impl<'a> BuildFileGenerator<'a> {
    pub fn new(manifest: &Manifest, python: PathBuf, platform: Platform, shell: &'a Shell) -> Self {
        let library_dir = manifest.library_dir();
        BuildFileGenerator {
            python,
            script: manifest.path(&manifest.generator.script),
            root: manifest.root().to_path_buf(),
            description: library_dir.join(manifest.library.description_file()),
            include: library_dir.join(manifest.library.include_file()),
            library_dir,
            target: manifest.library.name.clone(),
            platform,
            tool_dirs: Vec::new(),
            shell,
        }
    }

    /// Directories searched first for tools the generator spawns.
    pub fn tool_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.tool_dirs = dirs;
        self
    }

    /// Path of the dump the `gypd` backend writes next to the description.
    pub fn dump_file(&self) -> PathBuf {
        self.description.with_extension("gypd")
    }

    /// Generator command for one backend.
    pub fn command(
        &self,
        format: GeneratorFormat,
        defines: &GeneratorDefines,
        extra: &[String],
    ) -> ProcessBuilder {
        ProcessBuilder::new(&self.python)
            .arg(&self.script)
            .arg("--depth=.")
            .arg(format!("--toplevel-dir={}", self.library_dir.display()))
            .arg(format!("--format={}", format.as_str()))
            .arg(format!("-I{}", self.include.display()))
            .args(extra)
            .arg(&self.description)
            .env(DEFINES_ENV, defines.render())
            .path_prepend(&self.tool_dirs)
            .cwd(&self.root)
    }

    /// The generator joins `--generator-output` onto the toplevel dir, so
    /// the output root is passed relative to the library directory.
    fn ninja_args(&self, output_root: &Path) -> Vec<String> {
        let output = relative_path(&self.library_dir, output_root);
        vec![
            format!("--generator-output={}", output.display()),
            "-Goutput_dir=.".to_string(),
        ]
    }

    fn gypd_args(&self) -> Vec<String> {
        // The dump backend has no OS default of its own.
        vec![format!("-DOS={}", self.platform.os.generator_name())]
    }

    /// Generate the build graph for `configuration` under `output_root`
    /// and read back the macros the target is compiled with.
    ///
    /// The graph lands in `<output_root>/<configuration>/build.ninja`.
    /// Regenerating with identical inputs is expected to reproduce the
    /// same graph; a mismatch is logged.
    pub fn generate(
        &self,
        defines: GeneratorDefines,
        configuration: &str,
        output_root: &Path,
    ) -> Result<GeneratedBuild> {
        self.shell.status(
            Status::Generating,
            format!("{} ({})", self.target, configuration),
        );

        let build_dir = output_root.join(configuration);
        let graph_file = build_dir.join(GRAPH_FILE);

        let ninja = self.command(GeneratorFormat::Ninja, &defines, &self.ninja_args(output_root));
        self.run(&ninja)?;

        if !graph_file.is_file() {
            return Err(self.generation_error(format!(
                "generator did not produce {}",
                graph_file.display()
            )));
        }

        let fingerprint = sha256_file(&graph_file)?;
        let inputs = {
            let mut fp = Fingerprint::new();
            fp.update_str(&ninja.display_command());
            fp.update_str(&defines.render());
            fp.finish()
        };
        self.check_idempotent(&build_dir, &inputs, &fingerprint)?;

        let gypd = self.command(GeneratorFormat::Gypd, &defines, &self.gypd_args());
        self.run(&gypd)?;

        self.shell.status(Status::Extracting, format!("macros of {}", self.target));
        let dump_file = self.dump_file();
        let extracted = dump::extract(&dump_file, &self.target, configuration)?;

        Ok(GeneratedBuild {
            graph: BuildGraphHandle {
                configuration: configuration.to_string(),
                build_dir,
                graph_file,
                fingerprint,
            },
            macros: extracted.macros,
            libraries: extracted.libraries,
            dump_file,
        })
    }

    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        let output = cmd
            .exec()
            .map_err(|e| self.generation_error(format!("{:#}", e)))?;

        if !output.status.success() {
            return Err(self.generation_error(format!(
                "`{}` exited with code {:?}\n{}",
                cmd.display_command(),
                output.status.code(),
                combined_output(&output)
            )));
        }
        Ok(())
    }

    fn check_idempotent(&self, build_dir: &Path, inputs: &str, graph: &str) -> Result<()> {
        let stamp_path = build_dir.join(STAMP_FILE);

        if stamp_path.is_file() {
            let previous: Option<GraphStamp> = read_to_string(&stamp_path)
                .ok()
                .and_then(|s| serde_json::from_str(&s).ok());

            if let Some(previous) = previous {
                if previous.inputs == inputs && previous.graph != graph {
                    tracing::warn!(
                        "Regenerating {} with identical inputs changed {}",
                        self.target,
                        GRAPH_FILE
                    );
                    self.shell.warn(format!(
                        "build graph of `{}` is not reproducible",
                        self.target
                    ));
                }
            }
        }

        let stamp = GraphStamp {
            inputs: inputs.to_string(),
            graph: graph.to_string(),
        };
        let json = serde_json::to_string_pretty(&stamp).context("failed to serialize graph stamp")?;
        write_string(&stamp_path, &json)
    }

    fn generation_error(&self, message: String) -> anyhow::Error {
        PipelineError::BuildGraphGeneration {
            target: self.target.clone(),
            message,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Os, WordWidth};
    use crate::test_support::fixtures::{generator_script, write_project, SAMPLE_DUMP};
    use tempfile::TempDir;

    #[test]
    fn test_render_defines() {
        let defines = GeneratorDefines::new()
            .int("dynamic_msvc_runtime", 1)
            .list("conan_include_dirs", ["a".to_string(), "b".to_string()])
            .string("build_msvc_platform", "x64");

        assert_eq!(
            defines.render(),
            r#"dynamic_msvc_runtime=1 conan_include_dirs='"a" "b"' build_msvc_platform="x64""#
        );
    }

    #[test]
    fn test_single_item_list_is_plain_string() {
        let defines = GeneratorDefines::new().list("conan_include_dirs", ["only".to_string()]);
        assert_eq!(defines.render(), r#"conan_include_dirs="only""#);

        let empty = GeneratorDefines::new().list("conan_include_dirs", Vec::new());
        assert_eq!(empty.render(), "conan_include_dirs=''");
    }

    #[test]
    fn test_standard_defines() {
        let platform = Platform::new(Os::Windows, WordWidth::Bits32);
        let defines = GeneratorDefines::standard(
            &[PathBuf::from("/a"), PathBuf::from("/b")],
            Path::new("/cache/windows/release/build/Release"),
            &platform,
        );

        assert_eq!(defines.get("dynamic_msvc_runtime"), Some(&DefineValue::Int(1)));
        assert_eq!(
            defines.get("build_msvc_platform"),
            Some(&DefineValue::Str("Win32".into()))
        );
        assert!(defines.render().starts_with("dynamic_msvc_runtime=1 conan_include_dirs="));
    }

    #[test]
    fn test_defines_are_child_only() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_project(tmp.path())).unwrap();
        let shell = Shell::quiet();
        let generator = BuildFileGenerator::new(
            &manifest,
            PathBuf::from("python3"),
            Platform::new(Os::Linux, WordWidth::Bits64),
            &shell,
        );

        let defines = GeneratorDefines::new().int("dynamic_msvc_runtime", 1);
        let cmd = generator.command(GeneratorFormat::Gypd, &defines, &generator.gypd_args());

        assert_eq!(cmd.get_env(DEFINES_ENV), Some("dynamic_msvc_runtime=1"));
        assert!(std::env::var(DEFINES_ENV).is_err());

        let args = cmd.get_args();
        assert!(args.contains(&"--format=gypd".to_string()));
        assert!(args.contains(&"-DOS=linux".to_string()));
        assert!(args.last().unwrap().ends_with("libtgvoip.gyp"));
        assert_eq!(generator.dump_file(), manifest.library_dir().join("libtgvoip.gypd"));
    }

    #[test]
    fn test_generator_output_is_relative_to_toplevel_dir() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_project(tmp.path())).unwrap();
        let shell = Shell::quiet();
        let generator = BuildFileGenerator::new(
            &manifest,
            PathBuf::from("python3"),
            Platform::new(Os::Linux, WordWidth::Bits64),
            &shell,
        );

        let args = generator.ninja_args(&tmp.path().join("cache/linux/release/build"));
        assert_eq!(
            args[0],
            format!(
                "--generator-output={}",
                Path::new("../../cache/linux/release/build").display()
            )
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_with_scripted_generator() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_project(tmp.path())).unwrap();
        let output_root = tmp.path().join("cache/linux/release/build");
        let log = tmp.path().join("calls.log");
        std::fs::write(
            manifest.path(&manifest.generator.script),
            generator_script(SAMPLE_DUMP, &log),
        )
        .unwrap();

        let shell = Shell::quiet();
        let generator = BuildFileGenerator::new(
            &manifest,
            PathBuf::from("sh"),
            Platform::new(Os::Linux, WordWidth::Bits64),
            &shell,
        );

        let first = generator
            .generate(GeneratorDefines::new(), "Release", &output_root)
            .unwrap();
        assert_eq!(first.graph.build_dir, output_root.join("Release"));
        assert!(first.graph.graph_file.is_file());
        assert_eq!(first.macros.pairs(), vec![("HAVE_X", None), ("VER", Some("2"))]);
        assert_eq!(first.libraries, vec!["ssl"]);
        assert_eq!(first.dump_file, manifest.library_dir().join("libtgvoip.gypd"));

        let second = generator
            .generate(GeneratorDefines::new(), "Release", &output_root)
            .unwrap();
        assert_eq!(first.graph, second.graph);
    }

    #[cfg(unix)]
    #[test]
    fn test_generator_failure_is_generation_error() {
        let tmp = TempDir::new().unwrap();
        let manifest = Manifest::load(&write_project(tmp.path())).unwrap();
        std::fs::write(
            manifest.path(&manifest.generator.script),
            "echo 'gyp: Undefined variable conan_include_dirs' >&2; exit 1\n",
        )
        .unwrap();

        let shell = Shell::quiet();
        let generator = BuildFileGenerator::new(
            &manifest,
            PathBuf::from("sh"),
            Platform::new(Os::Linux, WordWidth::Bits64),
            &shell,
        );

        let err = generator
            .generate(GeneratorDefines::new(), "Release", &tmp.path().join("out"))
            .unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::BuildGraphGeneration { target, message }) => {
                assert_eq!(target, "libtgvoip");
                assert!(message.contains("Undefined variable"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
