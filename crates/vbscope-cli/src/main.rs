//! vbscope CLI - command-line surface for the vbscope analyzer
//!
//! Loads serialized VBA syntax element streams, builds the project scope
//! graph and prints diagnostics, definitions or rename locations.

mod cli;
mod commands;
mod logging;
mod output;

use clap::Parser;

use crate::cli::Cli;
use crate::commands::Commands;
use crate::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(&cli);

    match cli.command {
        Commands::Check(args) => args.run(),
        Commands::Definition(args) => args.run(),
        Commands::Rename(args) => args.run(),
    }
}
