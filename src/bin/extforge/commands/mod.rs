//! Command implementations

pub mod build;
pub mod clean;
pub mod completions;
pub mod macros;
pub mod platform;

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use extforge::core::manifest::Manifest;
use extforge::BuildVariant;
use extforge::GlobalContext;

/// Load the manifest from an explicit path or by searching upward.
pub(crate) fn load_manifest(ctx: &GlobalContext, manifest_path: Option<PathBuf>) -> Result<Manifest> {
    let path = match manifest_path {
        Some(path) => path,
        None => ctx.find_manifest()?,
    };
    Manifest::load(&path)
}

/// Variant from `--debug-level`, falling back to the environment.
pub(crate) fn variant(debug_level: Option<&str>) -> Result<BuildVariant> {
    match debug_level {
        Some(level) => BuildVariant::from_env_value(Some(level))
            .map_err(|_| anyhow!("invalid --debug-level `{}` (expected 0 or 1)", level)),
        None => BuildVariant::from_env(),
    }
}
