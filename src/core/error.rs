//! Pipeline stage errors.
//!
//! Every stage error is fatal: the pipeline performs no retries and builds
//! nothing partially. Stages return `anyhow::Result` and wrap these errors,
//! so callers recover the stage with `downcast_ref::<PipelineError>()`.

use std::path::PathBuf;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error raised by one pipeline stage.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum PipelineError {
    #[error("failed to resolve dependency `{reference}`: {message}")]
    #[diagnostic(code(extforge::resolve))]
    DependencyResolution { reference: String, message: String },

    #[error("failed to generate build files for `{target}`: {message}")]
    #[diagnostic(code(extforge::generate))]
    BuildGraphGeneration { target: String, message: String },

    /// The underlying tool's output is kept verbatim.
    #[error("native build failed in {}\n{output}", build_dir.display())]
    #[diagnostic(code(extforge::build))]
    BuildExecution { build_dir: PathBuf, output: String },

    #[error("configuration `{configuration}` of target `{target}` not found in {}", dump.display())]
    #[diagnostic(code(extforge::extract))]
    ConfigurationNotFound {
        dump: PathBuf,
        target: String,
        configuration: String,
        available: Vec<String>,
    },

    #[error("binding generation failed for {}\n{output}", interface.display())]
    #[diagnostic(code(extforge::bindings))]
    BindingGeneration { interface: PathBuf, output: String },
}

impl PipelineError {
    /// Short name of the failing stage.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::DependencyResolution { .. } => "dependency resolution",
            PipelineError::BuildGraphGeneration { .. } => "build-file generation",
            PipelineError::BuildExecution { .. } => "native build",
            PipelineError::ConfigurationNotFound { .. } => "macro extraction",
            PipelineError::BindingGeneration { .. } => "binding generation",
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            PipelineError::DependencyResolution { reference, message } => {
                Diagnostic::error(format!("could not resolve `{}`", reference))
                    .with_output(message.clone())
                    .with_help("check the reference spelling and its remote channel")
                    .with_help("run `extforge clean` if the dependency cache is corrupted")
            }

            PipelineError::BuildGraphGeneration { target, message } => {
                Diagnostic::error(format!("could not generate build files for `{}`", target))
                    .with_output(message.clone())
                    .with_help("check the `generator` and `library` paths in Extforge.toml")
            }

            PipelineError::BuildExecution { build_dir, output } => {
                Diagnostic::error("native library build failed")
                    .with_location(build_dir.clone())
                    .with_output(output.clone())
                    .with_help("fix the compiler error above and rerun `extforge build`")
            }

            PipelineError::ConfigurationNotFound {
                dump,
                target,
                configuration,
                available,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "no configuration `{}` for target `{}`",
                    configuration, target
                ))
                .with_location(dump.clone());

                if !available.is_empty() {
                    diag = diag.with_note(format!("available: {}", available.join(", ")));
                }

                diag.with_help("check `EXTFORGE_DEBUG` and the target name in Extforge.toml")
            }

            PipelineError::BindingGeneration { interface, output } => {
                Diagnostic::error("binding generator failed")
                    .with_location(interface.clone())
                    .with_output(output.clone())
            }
        };

        diag.with_stage(self.stage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_not_found_diagnostic() {
        let err = PipelineError::ConfigurationNotFound {
            dump: PathBuf::from("share/libtgvoip/libtgvoip.gypd"),
            target: "libtgvoip".into(),
            configuration: "Debug".into(),
            available: vec!["Release".into()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("no configuration `Debug`"));
        assert!(output.contains("available: Release"));
        assert!(output.starts_with("error[macro extraction]: "));
    }

    #[test]
    fn test_build_execution_keeps_output_verbatim() {
        let output = "src/VoIPController.cpp:12:5: error: expected ';'\n    int x\n    ^";
        let err = PipelineError::BuildExecution {
            build_dir: PathBuf::from("cache/linux/release/Release"),
            output: output.into(),
        };

        assert!(err.to_string().ends_with(output));
    }
}
