//! Conan CLI package manager.
//!
//! Packages are installed with `conan install --format=json`, and the JSON
//! graph on stdout is parsed instead of scraping human-oriented output:
//!
//! ```text
//! conan install --requires=opus/[~=1.2.1]@bincrafters/stable \
//!     --build=missing -s build_type=Release -s arch=x86_64 --format=json
//! ```
//!
//! `CONAN_HOME` is pointed at the cache namespace for the child process only,
//! so debug and release dependency sets never share a package store.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::sources::manager::{InstallReport, InstallRequest, PackageManager};
use crate::util::process::{combined_output, find_executable, ProcessBuilder};

/// Package manager backed by the `conan` executable.
#[derive(Debug, Clone)]
pub struct ConanCli {
    program: PathBuf,
}

impl ConanCli {
    /// Use an explicit `conan` binary, or find one on PATH.
    pub fn new(program: Option<PathBuf>) -> Result<Self> {
        let program = match program {
            Some(p) => p,
            None => find_executable("conan").with_context(|| {
                "conan not found\n\
                 \n\
                 The conan package manager is required to resolve dependencies.\n\
                 Install it (`pip install conan`) and ensure it's in your PATH."
            })?,
        };

        Ok(ConanCli { program })
    }

    /// Build the install command for a request.
    pub fn install_command(&self, request: &InstallRequest<'_>) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.program)
            .arg("install")
            .arg(format!("--requires={}", request.reference));

        for policy in request.policy.build_args() {
            cmd = cmd.arg(format!("--build={}", policy));
        }

        for option in request.options.to_args(&request.reference.name) {
            cmd = cmd.arg("-o").arg(option);
        }

        if let Some(settings) = request.settings {
            for setting in settings.to_args() {
                cmd = cmd.arg("-s").arg(setting);
            }
        }

        cmd.arg("--format=json")
            .env("CONAN_HOME", request.home.to_string_lossy())
    }
}

impl PackageManager for ConanCli {
    fn name(&self) -> &str {
        "conan"
    }

    fn install(&self, request: &InstallRequest<'_>) -> Result<InstallReport> {
        crate::util::fs::ensure_dir(request.home)?;

        let output = self.install_command(request).exec()?;
        if !output.status.success() {
            bail!(
                "conan install exited with code {:?}\n{}",
                output.status.code(),
                combined_output(&output)
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(&stdout).context("failed to parse conan install report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::{Arch, BuildType, OptionValue, PackageOptions, PackageReference, Settings};
    use crate::core::variant::BuildPolicy;
    use std::path::Path;

    #[test]
    fn test_install_command_library() {
        let conan = ConanCli::new(Some(PathBuf::from("conan"))).unwrap();
        let reference = PackageReference::parse("OpenSSL/latest_1.1.1x@conan/stable").unwrap();
        let options = PackageOptions::new().with("no_zlib", OptionValue::Bool(true));
        let request = InstallRequest {
            reference: &reference,
            options: &options,
            settings: Some(Settings::new(BuildType::Debug, Arch::X86_64)),
            policy: BuildPolicy::FromSource,
            home: Path::new("/cache/linux/debug-0/conan"),
        };

        let cmd = conan.install_command(&request);
        assert_eq!(
            cmd.get_args(),
            &[
                "install",
                "--requires=OpenSSL/latest_1.1.1x@conan/stable",
                "--build=missing",
                "--build=*",
                "-o",
                "OpenSSL/*:no_zlib=True",
                "-s",
                "build_type=Debug",
                "-s",
                "arch=x86_64",
                "--format=json",
            ]
        );
        assert_eq!(cmd.get_env("CONAN_HOME"), Some("/cache/linux/debug-0/conan"));
    }

    #[test]
    fn test_install_command_executable_has_no_settings() {
        let conan = ConanCli::new(Some(PathBuf::from("conan"))).unwrap();
        let reference = PackageReference::parse("ninja/1.9.0@bincrafters/stable").unwrap();
        let options = PackageOptions::new();
        let request = InstallRequest {
            reference: &reference,
            options: &options,
            settings: None,
            policy: BuildPolicy::Missing,
            home: Path::new("/tmp/conan"),
        };

        let args = conan.install_command(&request).get_args().to_vec();
        assert!(!args.iter().any(|a| a == "-s"));
        assert!(args.contains(&"--build=missing".to_string()));
    }
}
