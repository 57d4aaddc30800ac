mod cli;
mod config;
mod convert;
mod logging;
mod record;
mod run;

use std::process;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Command};
use crate::record::Operation;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = dispatch(cli.command) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Calibrate(args) => run::run(&args, Operation::Calibration),
        Command::Simulate(args) => run::run(&args, Operation::Simulation),
        Command::Forecast(args) => run::run(&args, Operation::Forecast),
        Command::Models => {
            run::list_models();
            Ok(())
        }
    }
}
