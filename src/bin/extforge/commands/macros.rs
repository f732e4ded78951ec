//! `extforge macros` command
//!
//! Reads the macros of one target configuration out of an existing dump,
//! without running the rest of the pipeline.

use anyhow::{Context, Result};

use crate::cli::MacrosArgs;
use extforge::builder::dump::extract;
use extforge::ops::merge_platform_macros;
use extforge::Platform;

pub fn execute(args: MacrosArgs) -> Result<()> {
    let extracted = extract(&args.dump, &args.target, &args.configuration)?;

    let macros = if args.with_platform {
        merge_platform_macros(&extracted.macros, &Platform::host())
    } else {
        extracted.macros
    };

    if args.json {
        let value = serde_json::json!({
            "target": args.target,
            "configuration": args.configuration,
            "define_macros": macros,
            "libraries": extracted.libraries,
        });
        let json = serde_json::to_string_pretty(&value).context("failed to serialize macros")?;
        println!("{}", json);
        return Ok(());
    }

    for flag in macros.to_flags() {
        println!("{}", flag);
    }
    for lib in &extracted.libraries {
        println!("-l{}", lib);
    }

    Ok(())
}
