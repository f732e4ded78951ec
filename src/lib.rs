//! extforge - build orchestration for native Python extensions
//!
//! This crate drives the external tools that turn a C++ library into a
//! compilable extension description: dependency resolution through a package
//! manager, build-file generation, native compilation, macro extraction, and
//! binding generation.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for extforge unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a recording package manager and on-disk
/// project fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    error::PipelineError, macros::MacroSet, manifest::Manifest, platform::Platform,
    variant::BuildVariant,
};

pub use ops::{BuildOptions, ExtensionDescriptor};
pub use util::context::GlobalContext;
