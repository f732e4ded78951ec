//! `extforge clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use extforge::core::platform::Os;
use extforge::ops::{clean, CleanScope};
use extforge::util::{GlobalContext, Shell, Status};

use super::{load_manifest, variant};

pub fn execute(args: CleanArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let manifest = load_manifest(&ctx, args.manifest_path)?;
    let config = ctx.load_config(manifest.root());

    let scope = if args.all {
        CleanScope::All
    } else {
        CleanScope::Namespace(Os::host(), variant(args.debug_level.as_deref())?)
    };

    match clean(&manifest, &config, scope)? {
        Some(dir) => shell.status(Status::Removed, dir.display()),
        None => shell.status(Status::Fresh, "nothing to clean"),
    }

    Ok(())
}
