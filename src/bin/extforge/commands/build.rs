//! `extforge build` command

use anyhow::{anyhow, Context, Result};

use crate::cli::BuildArgs;
use extforge::core::variant::BuildPolicy;
use extforge::ops::{build, BuildOptions};
use extforge::util::fs::write_string;
use extforge::util::{GlobalContext, Shell};
use extforge::Platform;

use super::{load_manifest, variant};

pub fn execute(args: BuildArgs, shell: &Shell) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let manifest = load_manifest(&ctx, args.manifest_path)?;

    // Load configuration (global + project)
    let config = ctx.load_config(manifest.root());

    // --build-policy overrides config
    let build_policy = args
        .build_policy
        .as_deref()
        .map(|s| s.parse::<BuildPolicy>())
        .transpose()
        .map_err(|e| anyhow!("invalid --build-policy: {}", e))?;

    let opts = BuildOptions {
        variant: variant(args.debug_level.as_deref())?,
        platform: Platform::host(),
        build_policy,
    };

    let result = build(&manifest, &config, &opts, shell)?;
    tracing::debug!(
        "Namespace {} (graph {})",
        result.namespace.display(),
        result.graph_fingerprint
    );

    let json = serde_json::to_string_pretty(&result.descriptor)
        .context("failed to serialize extension descriptor")?;

    match args.emit {
        Some(path) => {
            write_string(&path, &json)?;
            tracing::info!("Descriptor written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
