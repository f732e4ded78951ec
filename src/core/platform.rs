//! Target platform identity and the platform macros native headers expect.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::macros::{Define, MacroSet};

/// Operating system family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Windows,
    Macos,
    Linux,
}

impl Os {
    /// Detect the host operating system. Anything that is neither Windows
    /// nor macOS is treated as a generic Unix.
    pub fn host() -> Self {
        match std::env::consts::OS {
            "windows" => Os::Windows,
            "macos" => Os::Macos,
            _ => Os::Linux,
        }
    }

    /// Name used for the `OS` variable of the build-file generator.
    pub fn generator_name(&self) -> &'static str {
        match self {
            Os::Windows => "win",
            Os::Macos => "mac",
            Os::Linux => "linux",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "windows",
            Os::Macos => "macos",
            Os::Linux => "linux",
        }
    }

    /// Native static/import library extensions.
    pub fn library_extensions(&self) -> &'static [&'static str] {
        match self {
            Os::Windows => &["lib", "dll"],
            Os::Macos => &["a", "dylib"],
            Os::Linux => &["a", "so"],
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win32" | "win" => Ok(Os::Windows),
            "macos" | "darwin" | "mac" => Ok(Os::Macos),
            "linux" | "unix" => Ok(Os::Linux),
            _ => Err(format!("unknown operating system: {}", s)),
        }
    }
}

/// Pointer width of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WordWidth {
    #[serde(rename = "32")]
    Bits32,
    #[serde(rename = "64")]
    Bits64,
}

impl WordWidth {
    pub fn host() -> Self {
        if cfg!(target_pointer_width = "64") {
            WordWidth::Bits64
        } else {
            WordWidth::Bits32
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            WordWidth::Bits32 => 32,
            WordWidth::Bits64 => 64,
        }
    }
}

impl FromStr for WordWidth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "32" => Ok(WordWidth::Bits32),
            "64" => Ok(WordWidth::Bits64),
            _ => Err(format!("unsupported word width: {} (expected 32 or 64)", s)),
        }
    }
}

/// The platform a build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub word_width: WordWidth,
}

impl Platform {
    pub fn new(os: Os, word_width: WordWidth) -> Self {
        Platform { os, word_width }
    }

    /// Detect the host platform.
    pub fn host() -> Self {
        Platform::new(Os::host(), WordWidth::host())
    }

    pub fn is_windows(&self) -> bool {
        self.os == Os::Windows
    }

    /// MSVC platform name used by the build-file generator.
    pub fn msvc_platform(&self) -> &'static str {
        match self.word_width {
            WordWidth::Bits64 => "x64",
            WordWidth::Bits32 => "Win32",
        }
    }

    /// Link name of a native library: the full name on Windows, the name
    /// without its `lib` prefix elsewhere.
    pub fn link_name(&self, library: &str) -> String {
        if self.is_windows() {
            library.to_string()
        } else {
            library.strip_prefix("lib").unwrap_or(library).to_string()
        }
    }

    /// Platform macros for this platform.
    pub fn macros(&self) -> MacroSet {
        platform_macros(self.os, self.word_width)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.word_width.bits())
    }
}

/// Platform-identifying macros the native headers branch on.
///
/// The build-file generator never emits these itself, so they are merged
/// into the extracted macros before the binding generator runs.
pub fn platform_macros(os: Os, word_width: WordWidth) -> MacroSet {
    let mut macros = MacroSet::new();
    match os {
        Os::Windows => {
            macros.define(Define::flag("_WIN32"));
            if word_width == WordWidth::Bits64 {
                macros.define(Define::flag("_WIN64"));
            }
        }
        Os::Macos => {
            macros.define(Define::flag("_POSIX_VERSION"));
            macros.define(Define::flag("__APPLE__"));
            macros.define(Define::flag("__MACH__"));
        }
        Os::Linux => {
            macros.define(Define::flag("_POSIX_VERSION"));
            macros.define(Define::flag("__unix__"));
            macros.define(Define::flag("__unix"));
        }
    }
    macros
}
