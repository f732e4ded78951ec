//! Core data structures for extforge.
//!
//! This module contains the foundational types used throughout the pipeline:
//! - Preprocessor macro tables
//! - The Extforge.toml manifest
//! - Package references, options and settings
//! - Platform identity and build variants
//! - Stage errors

pub mod error;
pub mod macros;
pub mod manifest;
pub mod platform;
pub mod reference;
pub mod variant;

pub use error::PipelineError;
pub use macros::{Define, MacroSet};
pub use manifest::{find_manifest, Manifest, MANIFEST_NAME};
pub use platform::{platform_macros, Os, Platform, WordWidth};
pub use reference::{
    Arch, BuildType, DependencyKind, OptionValue, PackageOptions, PackageReference, Requirement,
    Settings, VersionSpec,
};
pub use variant::{BuildPolicy, BuildVariant};
