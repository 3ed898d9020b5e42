#![doc = include_str!("../README.md")]

mod cli;
mod commands;
mod report;

use clap::Parser;
use primelift_smt::backends::Cvc5Factory;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.solver_config()?;
    let factory = Cvc5Factory::new(cli.oracle.clone());

    match cli.command {
        Commands::Batch {
            dir,
            out_dir,
            json_out,
        } => commands::batch::run(&dir, &out_dir, json_out.as_deref(), &factory, &config),
        Commands::Solve { file } => commands::solve::run(&file, &factory, &config),
    }
}
