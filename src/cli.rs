use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// HOOPLA lumped hydrological modelling.
#[derive(Parser)]
#[command(
    name = "hoopla",
    version,
    about = "Lumped hydrological calibration, simulation and ensemble forecasting"
)]
pub struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Calibrate every catchment and model combination.
    Calibrate(RunArgs),
    /// Simulate with previously calibrated parameters.
    Simulate(RunArgs),
    /// Issue streamflow forecasts with previously calibrated parameters.
    Forecast(RunArgs),
    /// List the available models.
    Models,
}

/// Arguments shared by the run subcommands.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Path to TOML configuration file.
    #[arg(short, long, default_value = "hoopla.toml")]
    pub config: PathBuf,

    /// Override the output directory from config.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override global RNG seed from config.
    #[arg(short, long)]
    pub seed: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from(["hoopla", "-vv", "calibrate", "-c", "x.toml", "-s", "7"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Calibrate(args) => {
                assert_eq!(args.config, PathBuf::from("x.toml"));
                assert_eq!(args.seed, Some(7));
                assert!(args.output.is_none());
            }
            _ => panic!("expected calibrate"),
        }
    }

    #[test]
    fn models_takes_no_arguments() {
        assert!(matches!(
            Cli::try_parse_from(["hoopla", "models"]).unwrap().command,
            Command::Models
        ));
        assert!(Cli::try_parse_from(["hoopla", "models", "-c", "x"]).is_err());
    }
}
