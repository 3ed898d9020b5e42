use std::path::Path;

use primelift_core::run::{solve_file, Outcome, SolverConfig};
use primelift_smt::oracle::OracleFactory;

pub(crate) fn run(
    file: &Path,
    factory: &dyn OracleFactory,
    config: &SolverConfig,
) -> miette::Result<()> {
    let result = solve_file(file, factory, config);
    match &result.outcome {
        Outcome::Sat { model } => {
            println!("SAT");
            for (name, value) in model {
                println!("  {name} = {value}");
            }
        }
        other => println!("{other}"),
    }
    println!("runtime: {:.3}s", result.runtime_secs);
    Ok(())
}
