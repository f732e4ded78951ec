//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use extforge::util::shell::ColorChoice;
use extforge::util::Shell;

/// extforge - build orchestration for native Python extensions
#[derive(Parser)]
#[command(name = "extforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Colored output: auto, always, or never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn shell(&self) -> Shell {
        Shell::from_flags(self.quiet, self.verbose, self.color)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the whole pipeline and print the extension descriptor
    Build(BuildArgs),

    /// Extract preprocessor macros from a build-file dump
    Macros(MacrosArgs),

    /// Show the platform-identifying macros
    Platform(PlatformArgs),

    /// Remove cached dependencies and build outputs
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Path to Extforge.toml (defaults to searching upward from cwd)
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Write the descriptor JSON here instead of stdout
    #[arg(long)]
    pub emit: Option<PathBuf>,

    /// Debug level: 0 (debug symbols) or 1 (debug interpreter).
    /// Overrides EXTFORGE_DEBUG.
    #[arg(long)]
    pub debug_level: Option<String>,

    /// Release dependency build policy: never, missing, or always
    #[arg(long)]
    pub build_policy: Option<String>,
}

#[derive(Args)]
pub struct MacrosArgs {
    /// Build-file dump to read
    pub dump: PathBuf,

    /// Target whose macros to extract
    #[arg(long, default_value = "libtgvoip")]
    pub target: String,

    /// Build configuration
    #[arg(long, default_value = "Release")]
    pub configuration: String,

    /// Also merge the host platform macros
    #[arg(long)]
    pub with_platform: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PlatformArgs {
    /// Operating system (windows, macos, linux); defaults to the host
    #[arg(long)]
    pub os: Option<String>,

    /// Word width (32 or 64); defaults to the host
    #[arg(long)]
    pub bits: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Path to Extforge.toml (defaults to searching upward from cwd)
    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    /// Debug level of the namespace to remove; defaults to EXTFORGE_DEBUG
    #[arg(long)]
    pub debug_level: Option<String>,

    /// Remove the whole cache, every platform and variant
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
