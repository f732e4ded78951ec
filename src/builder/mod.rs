//! Native build: build-file generation, macro extraction, compilation, and
//! binding generation.

pub mod dump;
pub mod gyp;
pub mod literal;
pub mod ninja;
pub mod swig;

pub use dump::{extract, DumpFile, Extracted};
pub use gyp::{BuildFileGenerator, BuildGraphHandle, GeneratedBuild, GeneratorDefines, GeneratorFormat};
pub use ninja::{ArtifactPaths, NinjaExecutor};
pub use swig::{BindingGenerator, GeneratedSources};
