//! Build variants and the dependency build policy they imply.
//!
//! The variant is selected by the `EXTFORGE_DEBUG` environment variable:
//!
//! | value | variant        | configuration | dependencies      | debug interpreter |
//! |-------|----------------|---------------|-------------------|-------------------|
//! | unset | `Release`      | `Release`     | prebuilt, missing | no                |
//! | `0`   | `DebugSymbols` | `Debug`       | from source       | no                |
//! | `1`   | `FullDebug`    | `Debug`       | from source       | yes               |

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::core::reference::BuildType;

/// Environment variable selecting the build variant.
pub const DEBUG_ENV_VAR: &str = "EXTFORGE_DEBUG";

/// One build invocation's variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildVariant {
    #[default]
    Release,
    /// Native library and dependencies carry debug symbols; the host
    /// interpreter is still a release build.
    DebugSymbols,
    /// Debug everything, including the host interpreter runtime.
    FullDebug,
}

impl BuildVariant {
    /// Read the variant from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_value(std::env::var(DEBUG_ENV_VAR).ok().as_deref())
    }

    /// Interpret a raw `EXTFORGE_DEBUG` value.
    pub fn from_env_value(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(BuildVariant::Release),
            Some("0") => Ok(BuildVariant::DebugSymbols),
            Some("1") => Ok(BuildVariant::FullDebug),
            Some(other) => bail!(
                "invalid {} value `{}` (expected unset, \"0\" or \"1\")",
                DEBUG_ENV_VAR,
                other
            ),
        }
    }

    pub fn is_debug(&self) -> bool {
        !matches!(self, BuildVariant::Release)
    }

    /// Build type of the native library and its dependencies.
    pub fn build_type(&self) -> BuildType {
        if self.is_debug() {
            BuildType::Debug
        } else {
            BuildType::Release
        }
    }

    /// Name of the configuration selected in the build description.
    pub fn configuration_name(&self) -> &'static str {
        self.build_type().as_str()
    }

    /// Whether the host interpreter the extension loads into is a debug build.
    pub fn debug_interpreter(&self) -> bool {
        matches!(self, BuildVariant::FullDebug)
    }

    /// Directory-safe name used to namespace caches.
    pub fn slug(&self) -> &'static str {
        match self {
            BuildVariant::Release => "release",
            BuildVariant::DebugSymbols => "debug-0",
            BuildVariant::FullDebug => "debug-1",
        }
    }

    /// Effective dependency build policy, given the configured default.
    ///
    /// Debug variants always build from source so that debug-symbol paths
    /// embedded in dependency binaries are valid on this machine.
    pub fn build_policy(&self, default: BuildPolicy) -> BuildPolicy {
        self.build_type().build_policy(default)
    }
}

impl fmt::Display for BuildVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// How the package manager may satisfy a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildPolicy {
    /// Use prebuilt binaries only; fail when none match.
    PrebuiltOnly,
    /// Use prebuilt binaries; build from source only when none match.
    #[default]
    Missing,
    /// Never use prebuilt binaries.
    FromSource,
}

impl BuildPolicy {
    /// Values for the package manager's `--build` option.
    pub fn build_args(&self) -> Vec<&'static str> {
        match self {
            BuildPolicy::PrebuiltOnly => vec!["never"],
            BuildPolicy::Missing => vec!["missing"],
            BuildPolicy::FromSource => vec!["missing", "*"],
        }
    }
}

impl FromStr for BuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prebuilt-only" | "never" => Ok(BuildPolicy::PrebuiltOnly),
            "missing" => Ok(BuildPolicy::Missing),
            "from-source" | "always" => Ok(BuildPolicy::FromSource),
            _ => Err(format!("unknown build policy: {}", s)),
        }
    }
}
