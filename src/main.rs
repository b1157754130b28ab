//! `wsl-setup` command-line entry point.

use anyhow::Result;
use clap::Parser;

use wsl_setup::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match args.command {
        cli::Command::Apply(opts) => commands::apply::run(&args.global, &opts, args.verbose),
        cli::Command::List => {
            logging::init_subscriber(args.verbose, None)?;
            commands::list::run(&args.global)
        }
        cli::Command::Render(opts) => {
            logging::init_subscriber(args.verbose, None)?;
            commands::render::run(&args.global, &opts)
        }
        cli::Command::Version => {
            commands::version::run();
            Ok(())
        }
    }
}
