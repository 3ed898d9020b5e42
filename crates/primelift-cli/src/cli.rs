use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use primelift_core::encode::{EncodingMode, SizingPolicy};
use primelift_core::run::SolverConfig;

#[derive(Parser)]
#[command(name = "primelift")]
#[command(about = "Satisfiability of quantifier-free integer formulas by prime-modular \
                   decomposition and CRT lifting")]
#[command(version)]
pub(crate) struct Cli {
    /// Modular encoding: "integer" or "bitvector".
    #[arg(long, global = true, default_value = "bitvector")]
    pub encoding: String,

    /// Bitvector width policy: "prime-squared" or "fanin".
    #[arg(long, global = true, default_value = "prime-squared")]
    pub sizing: String,

    /// Per-check-sat time limit handed to the oracle, in milliseconds.
    #[arg(long, global = true, default_value_t = 10000)]
    pub check_limit: u64,

    /// Wall-clock budget per file, in seconds (0 disables the budget).
    #[arg(long, global = true, default_value_t = 10)]
    pub file_budget: u64,

    /// Oracle binary, spoken to over SMT-LIB2 pipes.
    #[arg(long, global = true, default_value = "cvc5")]
    pub oracle: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Solve every .smt2 file under a directory and write a results CSV.
    Batch {
        /// Directory scanned recursively for .smt2 files.
        dir: PathBuf,

        /// Directory the results CSV is written to.
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,

        /// Also write a pretty-printed JSON artifact of every run.
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
    /// Solve a single file and print the outcome.
    Solve {
        /// The .smt2 file to solve.
        file: PathBuf,
    },
}

impl Cli {
    pub(crate) fn solver_config(&self) -> miette::Result<SolverConfig> {
        Ok(SolverConfig {
            mode: parse_encoding(&self.encoding)?,
            sizing: parse_sizing(&self.sizing)?,
            check_limit_ms: Some(self.check_limit),
            file_budget: match self.file_budget {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        })
    }
}

fn parse_encoding(name: &str) -> miette::Result<EncodingMode> {
    match name {
        "integer" => Ok(EncodingMode::Integer),
        "bitvector" => Ok(EncodingMode::Bitvector),
        other => Err(miette::miette!(
            "unknown encoding `{other}` (expected `integer` or `bitvector`)"
        )),
    }
}

fn parse_sizing(name: &str) -> miette::Result<SizingPolicy> {
    match name {
        "prime-squared" => Ok(SizingPolicy::PrimeSquared),
        "fanin" => Ok(SizingPolicy::MulFanIn),
        other => Err(miette::miette!(
            "unknown sizing policy `{other}` (expected `prime-squared` or `fanin`)"
        )),
    }
}
