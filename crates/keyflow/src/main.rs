#![warn(missing_docs)]
//! keyflow: inspect configurations and replay key traces through the engine.

use std::process;

use clap::Parser;
use tracing::error;

mod check;
mod cli;
mod error;
mod list;
mod replay;
mod trace;

use cli::{Cli, Commands};
use error::{Error, Result};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("{}", err.pretty());
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log.spec());

    match &cli.command {
        Commands::Check => check::run(&cli.config),
        Commands::List(args) => {
            let config = config::load_from_path(&cli.config)?;
            list::run(&config, cli.app.as_deref(), &args.prefix);
            Ok(())
        }
        Commands::Replay(args) => {
            let config = config::load_from_path(&cli.config)?;
            replay::run(&config, cli.app.clone(), cli.user_modes(), args)
        }
    }
}
