use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::cmd::{self, inspect::InspectArgs, run::RunArgs};
use crate::{config, logging};

#[derive(Parser, Debug)]
#[command(
    name = "stepform",
    about = "Inspect and replay multi-step form documents",
    version,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Wizard configuration (TOML); defaults apply when omitted
    #[arg(long, value_name = "wizard.toml", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List declared and visible steps of every wizard in a document
    Inspect(InspectArgs),
    /// Replay a scripted session against a document
    Run(RunArgs),
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;
    let config = config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Inspect(args) => cmd::inspect::run(&args, &config),
        Commands::Run(args) => cmd::run::run(&args, &config),
    }
}
