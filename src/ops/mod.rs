//! High-level operations.
//!
//! This module contains the implementation of extforge commands.

pub mod assemble;
pub mod build_ext;
pub mod clean;

pub use assemble::{assemble, BaseDescriptor, ExtensionDescriptor};
pub use build_ext::{build, build_with, merge_platform_macros, BuildOptions, BuildResult};
pub use clean::{clean, CleanScope};
