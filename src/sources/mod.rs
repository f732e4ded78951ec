//! Dependency sources.
//!
//! Dependencies are installed by an external package manager into a cache
//! namespace scoped to the platform and build variant, then reported back
//! as directories, link names, and environment.

pub mod cache;
pub mod conan;
pub mod manager;
pub mod resolver;

pub use cache::CacheNamespace;
pub use conan::ConanCli;
pub use manager::{InstallReport, InstallRequest, PackageManager};
pub use resolver::{DependencyResolver, ExecutableTool, ResolvedPackage};
