//! Package references, install options, and target settings.
//!
//! A reference uses the package manager's textual coordinate form:
//!
//! ```text
//! name/version[@user/channel]
//! OpenSSL/latest_1.1.1x@conan/stable
//! opus/[~=1.2.1]@bincrafters/stable
//! ```
//!
//! The rendered form must stay byte-stable, since it is the wire format
//! handed to the package manager and part of the resolution cache key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use semver::VersionReq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::platform::WordWidth;
use crate::core::variant::BuildPolicy;

static REFERENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>[A-Za-z0-9_][A-Za-z0-9_.+-]*)/(?P<version>[^@/\s]+)(?:@(?P<user>[^/@\s]+)/(?P<channel>[^/@\s]+))?$",
    )
    .expect("reference regex is valid")
});

static OPTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$").expect("option regex is valid"));

/// Version part of a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    /// A literal version or alias, e.g. `1.0` or `latest_1.1.1x`
    Exact(String),
    /// A bracketed range, e.g. `[~=1.2.1]`
    Range { raw: String, req: VersionReq },
}

impl VersionSpec {
    /// Parse the version part of a reference.
    pub fn parse(s: &str) -> Result<Self> {
        let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) else {
            if s.contains('[') || s.contains(']') {
                bail!("unbalanced brackets in version `{}`", s);
            }
            return Ok(VersionSpec::Exact(s.to_string()));
        };

        // The package manager writes `~=` for "compatible release" and
        // separates comparators with spaces.
        let normalized = inner
            .replace("~=", "~")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(", ");

        let req = VersionReq::parse(&normalized)
            .with_context(|| format!("invalid version range `{}`", s))?;

        Ok(VersionSpec::Range {
            raw: s.to_string(),
            req,
        })
    }

    pub fn is_range(&self) -> bool {
        matches!(self, VersionSpec::Range { .. })
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Exact(v) => f.write_str(v),
            VersionSpec::Range { raw, .. } => f.write_str(raw),
        }
    }
}

/// A versioned coordinate of an external package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub name: String,
    pub version: VersionSpec,
    pub user: Option<String>,
    pub channel: Option<String>,
}

impl PackageReference {
    /// Parse a `name/version[@user/channel]` coordinate.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let caps = REFERENCE_RE.captures(s).with_context(|| {
            format!(
                "invalid package reference `{}` (expected name/version[@user/channel])",
                s
            )
        })?;

        let version = VersionSpec::parse(&caps["version"])
            .with_context(|| format!("invalid package reference `{}`", s))?;

        Ok(PackageReference {
            name: caps["name"].to_string(),
            version,
            user: caps.name("user").map(|m| m.as_str().to_string()),
            channel: caps.name("channel").map(|m| m.as_str().to_string()),
        })
    }

    /// Environment-variable-safe form of the package name.
    pub fn env_name(&self) -> String {
        Self::env_name_of(&self.name)
    }

    /// Environment-variable-safe form of a bare package name.
    pub fn env_name_of(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{}/{}", user, channel)?;
        }
        Ok(())
    }
}

impl FromStr for PackageReference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        PackageReference::parse(s)
    }
}

impl Serialize for PackageReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PackageReference::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Value of an install option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The package manager spells booleans the way its recipes do.
            OptionValue::Bool(true) => f.write_str("True"),
            OptionValue::Bool(false) => f.write_str("False"),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Str(s) => f.write_str(s),
        }
    }
}

/// Install options of one dependency, keyed by option name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageOptions(BTreeMap<String, OptionValue>);

impl PackageOptions {
    pub fn new() -> Self {
        PackageOptions::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: OptionValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OptionValue)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Check option names are well-formed identifiers.
    pub fn validate(&self) -> Result<()> {
        for name in self.0.keys() {
            if !OPTION_NAME_RE.is_match(name) {
                bail!("invalid option name `{}`", name);
            }
        }
        Ok(())
    }

    /// Render as `package/*:name=value` arguments, in name order.
    pub fn to_args(&self, package: &str) -> Vec<String> {
        self.0
            .iter()
            .map(|(name, value)| format!("{}/*:{}={}", package, name, value))
            .collect()
    }
}

/// Build type setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Release => "Release",
            BuildType::Debug => "Debug",
        }
    }

    /// Debug builds never use prebuilt binaries.
    pub fn build_policy(&self, default: BuildPolicy) -> BuildPolicy {
        match self {
            BuildType::Debug => BuildPolicy::FromSource,
            BuildType::Release => default,
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Armv8,
}

impl Arch {
    /// Detect the host architecture.
    pub fn host() -> Self {
        match std::env::consts::ARCH {
            "aarch64" => Arch::Armv8,
            _ => Arch::from_word_width(WordWidth::host()),
        }
    }

    pub fn from_word_width(width: WordWidth) -> Self {
        match width {
            WordWidth::Bits64 => Arch::X86_64,
            WordWidth::Bits32 => Arch::X86,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv8 => "armv8",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target settings applied to linkable dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Settings {
    pub build_type: BuildType,
    pub arch: Arch,
}

impl Settings {
    pub fn new(build_type: BuildType, arch: Arch) -> Self {
        Settings { build_type, arch }
    }

    /// Render as `key=value` arguments.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            format!("build_type={}", self.build_type),
            format!("arch={}", self.arch),
        ]
    }
}

/// How a dependency is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    /// Headers and libraries linked into the extension
    #[default]
    Library,
    /// A tool invoked as a subprocess
    Executable,
}

/// A dependency declared by the project: a reference plus its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirement {
    pub reference: PackageReference,

    #[serde(default)]
    pub kind: DependencyKind,

    #[serde(default, skip_serializing_if = "PackageOptions::is_empty")]
    pub options: PackageOptions,
}

impl Requirement {
    pub fn library(reference: PackageReference) -> Self {
        Requirement {
            reference,
            kind: DependencyKind::Library,
            options: PackageOptions::new(),
        }
    }

    pub fn executable(reference: PackageReference) -> Self {
        Requirement {
            reference,
            kind: DependencyKind::Executable,
            options: PackageOptions::new(),
        }
    }

    pub fn with_options(mut self, options: PackageOptions) -> Self {
        self.options = options;
        self
    }
}
