//! extforge CLI - builds native Python extensions from a C++ library

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use extforge::util::diagnostic::emit;
use extforge::util::Shell;
use extforge::PipelineError;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let shell = cli.shell();

    if let Err(e) = run(cli, &shell) {
        match e.downcast_ref::<PipelineError>() {
            Some(stage) => emit(&stage.to_diagnostic(), shell.use_color()),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Shell) -> Result<()> {
    // Set up logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("extforge=debug")
    } else if cli.quiet {
        EnvFilter::new("extforge=warn")
    } else {
        EnvFilter::new("extforge=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args, shell),
        Commands::Macros(args) => commands::macros::execute(args),
        Commands::Platform(args) => commands::platform::execute(args),
        Commands::Clean(args) => commands::clean::execute(args, shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
