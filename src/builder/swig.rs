//! Binding generation with SWIG.
//!
//! SWIG preprocesses the interface description itself, so it has to see the
//! same include paths and defines the native library was compiled with.
//! Otherwise `#ifdef` blocks in the interface resolve differently and the
//! wrapper silently disagrees with the compiled binary.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::core::error::PipelineError;
use crate::core::macros::{Define, MacroSet};
use crate::util::fs::{ensure_dir, remove_file_if_exists};
use crate::util::process::{combined_output, find_swig, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Generator-only define that keeps the glue from selecting debug
/// interpreter symbols, which a release interpreter doesn't export.
pub const NO_DEBUG_INTERPRETER_MACRO: &str = "SWIG_PYTHON_INTERPRETER_NO_DEBUG";

/// Mode switches: C++ input, Python 3 output.
const MODE_FLAGS: &[&str] = &["-c++", "-python", "-py3"];

static MODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*%module\s*(?:\([^)]*\)\s*)?"?([A-Za-z_][A-Za-z0-9_]*)"?"#)
        .expect("module regex is valid")
});

/// Outputs of one binding generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSources {
    /// Host-language wrapper module
    pub wrapper_module: PathBuf,
    /// Native glue source compiled into the extension
    pub glue_source: PathBuf,
    /// Generator flags, excluding input and output file arguments
    pub flags: Vec<String>,
}

/// Invokes SWIG on an interface description.
pub struct BindingGenerator<'a> {
    program: PathBuf,
    shell: &'a Shell,
}

impl<'a> BindingGenerator<'a> {
    /// Use an explicit binary, or find one on PATH.
    pub fn new(program: Option<PathBuf>, shell: &'a Shell) -> Result<Self> {
        let program = match program {
            Some(p) => p,
            None => find_swig().context(
                "SWIG not found\n\
                 \n\
                 SWIG is required to generate the Python bindings.\n\
                 Install SWIG 4 and ensure it's in your PATH.",
            )?,
        };
        Ok(BindingGenerator { program, shell })
    }

    /// Flags for one invocation.
    ///
    /// `macros` become `-D` flags in order. The interpreter-debug define is
    /// added for release interpreters only and never enters `macros`.
    pub fn flags(
        include_dirs: &[PathBuf],
        macros: &MacroSet,
        output_dir: &Path,
        debug_interpreter: bool,
    ) -> Vec<String> {
        let mut flags = vec![
            "-Wall".to_string(),
            "-outdir".to_string(),
            output_dir.to_string_lossy().into_owned(),
        ];
        flags.extend(MODE_FLAGS.iter().map(|f| f.to_string()));
        flags.extend(include_dirs.iter().map(|d| format!("-I{}", d.display())));
        flags.extend(macros.to_flags());

        if !debug_interpreter && !macros.contains(NO_DEBUG_INTERPRETER_MACRO) {
            flags.push(Define::flag(NO_DEBUG_INTERPRETER_MACRO).to_flag());
        }
        flags
    }

    /// Generate the wrapper module into `output_dir` and the glue source
    /// next to the interface file.
    ///
    /// On failure both outputs are removed, so no partial sources survive.
    pub fn invoke(
        &self,
        interface: &Path,
        include_dirs: &[PathBuf],
        macros: &MacroSet,
        output_dir: &Path,
        debug_interpreter: bool,
    ) -> Result<GeneratedSources> {
        self.shell.status(Status::Binding, interface.display());

        let module = module_name(interface)?;
        let wrapper_module = output_dir.join(format!("{}.py", module));
        let glue_source = glue_source_path(interface);
        let flags = Self::flags(include_dirs, macros, output_dir, debug_interpreter);

        ensure_dir(output_dir)?;
        // Outputs of an earlier run must not pass for this one's.
        remove_file_if_exists(&glue_source)?;
        remove_file_if_exists(&wrapper_module)?;

        let cmd = ProcessBuilder::new(&self.program)
            .args(&flags)
            .arg("-o")
            .arg(&glue_source)
            .arg(interface);

        let failure = match cmd.exec() {
            Ok(output) if output.status.success() && glue_source.is_file() => {
                return Ok(GeneratedSources {
                    wrapper_module,
                    glue_source,
                    flags,
                });
            }
            Ok(output) if output.status.success() => {
                format!("swig did not produce {}", glue_source.display())
            }
            Ok(output) => combined_output(&output),
            Err(e) => format!("{:#}", e),
        };

        for partial in [&glue_source, &wrapper_module] {
            if let Err(e) = remove_file_if_exists(partial) {
                tracing::warn!("{:#}", e);
            }
        }

        Err(PipelineError::BindingGeneration {
            interface: interface.to_path_buf(),
            output: failure,
        }
        .into())
    }
}

/// Glue source path the packaging tool expects: `<stem>_wrap.cpp` beside the
/// interface.
pub fn glue_source_path(interface: &Path) -> PathBuf {
    let stem = interface
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    interface.with_file_name(format!("{}_wrap.cpp", stem))
}

/// Module name declared by `%module`, or the interface file stem.
fn module_name(interface: &Path) -> Result<String> {
    let content = std::fs::read_to_string(interface)
        .with_context(|| format!("failed to read interface: {}", interface.display()))?;

    if let Some(caps) = MODULE_RE.captures(&content) {
        return Ok(caps[1].to_string());
    }

    Ok(interface
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default())
}
