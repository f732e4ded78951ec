//! `extforge platform` command

use anyhow::{anyhow, Context, Result};

use crate::cli::PlatformArgs;
use extforge::core::platform::{Os, WordWidth};
use extforge::Platform;

pub fn execute(args: PlatformArgs) -> Result<()> {
    let os = match args.os {
        Some(s) => s.parse::<Os>().map_err(|e| anyhow!(e))?,
        None => Os::host(),
    };
    let word_width = match args.bits {
        Some(s) => s.parse::<WordWidth>().map_err(|e| anyhow!(e))?,
        None => WordWidth::host(),
    };

    let platform = Platform::new(os, word_width);
    let macros = platform.macros();

    if args.json {
        let value = serde_json::json!({
            "platform": platform.to_string(),
            "link_name": platform.link_name("libtgvoip"),
            "define_macros": macros,
        });
        let json = serde_json::to_string_pretty(&value).context("failed to serialize macros")?;
        println!("{}", json);
        return Ok(());
    }

    for flag in macros.to_flags() {
        println!("{}", flag);
    }

    Ok(())
}
