//! Build graph execution with ninja.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::gyp::BuildGraphHandle;
use crate::core::error::PipelineError;
use crate::core::platform::Platform;
use crate::util::fs::find_files_with_extensions;
use crate::util::process::{combined_output, find_executable_in, ProcessBuilder};
use crate::util::shell::{format_duration, Shell, Status};

/// Compiled native library outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Directory the extension links from
    pub library_dir: PathBuf,
    /// Library files found there
    pub library_files: Vec<PathBuf>,
    /// Name the extension links the library by
    pub link_name: String,
}

/// Runs `ninja` over a generated build graph.
pub struct NinjaExecutor<'a> {
    program: PathBuf,
    tool_dirs: Vec<PathBuf>,
    platform: Platform,
    library: String,
    shell: &'a Shell,
}

impl<'a> NinjaExecutor<'a> {
    /// Locate ninja: an explicit path, then resolved tool dirs, then PATH.
    pub fn new(
        program: Option<PathBuf>,
        tool_dirs: Vec<PathBuf>,
        platform: Platform,
        library: impl Into<String>,
        shell: &'a Shell,
    ) -> Result<Self> {
        let program = match program {
            Some(p) => p,
            None => find_executable_in("ninja", &tool_dirs).context(
                "ninja not found\n\
                 \n\
                 Ninja is required to build the native library.\n\
                 Declare it as an executable dependency or install it in your PATH.",
            )?,
        };

        Ok(NinjaExecutor {
            program,
            tool_dirs,
            platform,
            library: library.into(),
            shell,
        })
    }

    pub fn command(&self, graph: &BuildGraphHandle) -> ProcessBuilder {
        ProcessBuilder::new(&self.program)
            .arg("--verbose")
            .arg("-C")
            .arg(&graph.build_dir)
            .path_prepend(&self.tool_dirs)
    }

    /// Build everything in the graph.
    ///
    /// Failure carries ninja's output unmodified.
    pub fn build(&self, graph: &BuildGraphHandle) -> Result<ArtifactPaths> {
        let cmd = self.command(graph);
        let spinner = self.shell.spinner(
            Status::Building,
            format!("{} ({})", self.library, graph.configuration),
        );

        let output = cmd.exec()?;
        let elapsed = spinner.finish();

        if !output.status.success() {
            return Err(PipelineError::BuildExecution {
                build_dir: graph.build_dir.clone(),
                output: combined_output(&output),
            }
            .into());
        }

        tracing::debug!(
            "ninja finished in {}:\n{}",
            format_duration(elapsed),
            String::from_utf8_lossy(&output.stdout)
        );

        let library_files =
            find_files_with_extensions(&graph.build_dir, self.platform.os.library_extensions());
        if library_files.is_empty() {
            tracing::warn!("No native libraries found in {}", graph.build_dir.display());
        }

        Ok(ArtifactPaths {
            library_dir: graph.build_dir.clone(),
            library_files,
            link_name: self.platform.link_name(&self.library),
        })
    }
}
