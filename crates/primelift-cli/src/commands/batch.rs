//! Batch driver: discover, supervise, report.
//!
//! Each file is solved on its own worker thread while the driver waits with
//! a bounded `recv_timeout`. The solver loop checks its own deadline before
//! every oracle call, so the supervision here is a backstop for a worker
//! stuck inside a single long check: its late result is discarded and the
//! file is recorded as UNKNOWN (TIMEOUT).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use miette::IntoDiagnostic;
use primelift_core::run::{solve_file, Outcome, RunResult, SolverConfig};
use primelift_smt::oracle::OracleFactory;
use tracing::{info, warn};

use crate::report;

/// Slack on top of the per-file budget before the driver gives up on a
/// worker; covers files whose final in-budget check finishes just under the
/// wire.
const SUPERVISION_GRACE: Duration = Duration::from_secs(2);

pub(crate) fn run<F>(
    dir: &Path,
    out_dir: &Path,
    json_out: Option<&Path>,
    factory: &F,
    config: &SolverConfig,
) -> miette::Result<()>
where
    F: OracleFactory + Clone + Send + 'static,
{
    let files = discover(dir).into_diagnostic()?;
    if files.is_empty() {
        warn!(dir = %dir.display(), "no .smt2 files found");
    }

    let mut results = Vec::with_capacity(files.len());
    for file in &files {
        let result = supervised_solve(file, factory, config);
        info!(file = %result.test, outcome = %result.outcome, runtime_secs = result.runtime_secs);
        results.push(result);
    }

    let csv_path = out_dir.join("results.csv");
    report::write_csv(&csv_path, &results).into_diagnostic()?;
    if let Some(path) = json_out {
        report::write_json_artifact(path, &results)?;
    }
    println!("Results written to {}", csv_path.display());
    Ok(())
}

/// Solve one file on a worker thread, bounded by the configured budget.
fn supervised_solve<F>(path: &Path, factory: &F, config: &SolverConfig) -> RunResult
where
    F: OracleFactory + Clone + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let worker_path = path.to_path_buf();
    let worker_factory = factory.clone();
    let worker_config = *config;
    let handle = thread::spawn(move || {
        let _ = tx.send(solve_file(&worker_path, &worker_factory, &worker_config));
    });

    let test = display_name(path);
    match config.file_budget {
        Some(budget) => match rx.recv_timeout(budget + SUPERVISION_GRACE) {
            Ok(result) => {
                let _ = handle.join();
                result
            }
            Err(_) => {
                warn!(file = %test, "worker exceeded the file budget; abandoning it");
                RunResult {
                    test,
                    runtime_secs: budget.as_secs_f64(),
                    outcome: Outcome::timeout(),
                }
            }
        },
        None => match rx.recv() {
            Ok(result) => {
                let _ = handle.join();
                result
            }
            Err(_) => RunResult {
                test,
                runtime_secs: 0.0,
                outcome: Outcome::error("solver worker panicked".to_string()),
            },
        },
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Recursively collect `.smt2` files, numeric filename stems first in
/// ascending order, then the rest lexicographically.
fn discover(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort_by_key(|path| sort_key(path));
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "smt2") {
            out.push(path);
        }
    }
    Ok(())
}

fn sort_key(path: &Path) -> (u8, i64, String) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.parse::<i64>() {
        Ok(n) => (0, n, stem),
        Err(_) => (1, 0, stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primelift_smt::eval::ExhaustiveFactory;

    fn touch(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn discovery_sorts_numeric_stems_first() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("10.smt2"), "");
        touch(&root.join("2.smt2"), "");
        touch(&root.join("sub").join("1.smt2"), "");
        touch(&root.join("alpha.smt2"), "");
        touch(&root.join("notes.txt"), "");

        let names: Vec<String> = discover(root)
            .unwrap()
            .iter()
            .map(|path| display_name(path))
            .collect();
        assert_eq!(names, ["1.smt2", "2.smt2", "10.smt2", "alpha.smt2"]);
    }

    #[test]
    fn batch_writes_per_file_rows_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(
            &root.join("1.smt2"),
            "(declare-const x)(assert (= x (+ x 1)))",
        );
        touch(&root.join("2.smt2"), "(declare-const x)(assert (= x 7))");
        let out_dir = root.join("results");

        let factory = ExhaustiveFactory::default();
        run(root, &out_dir, None, &factory, &SolverConfig::default()).unwrap();

        let csv = fs::read_to_string(out_dir.join("results.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("1.smt2,"));
        assert!(lines[1].contains(",UNSAT,"));
        assert!(lines[2].starts_with("2.smt2,"));
        assert!(lines[2].contains(",SAT,"));
        assert!(lines[2].ends_with("x=7"));
        assert!(lines[3].contains("Total: 1 SAT, 1 UNSAT, 0 UNKNOWN"));
    }

    #[test]
    fn json_artifact_is_written_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("1.smt2"), "(declare-const x)(assert (= x 1))");
        let out_dir = root.join("results");
        let json_path = root.join("runs.json");

        let factory = ExhaustiveFactory::default();
        run(
            root,
            &out_dir,
            Some(&json_path),
            &factory,
            &SolverConfig::default(),
        )
        .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value[0]["outcome"]["status"], "sat");
    }

    #[test]
    fn supervision_records_timeout_for_a_stuck_worker() {
        // A factory whose sessions block forever inside check_sat.
        #[derive(Clone)]
        struct Stuck;

        struct StuckOracle;

        impl primelift_smt::oracle::Oracle for StuckOracle {
            fn declare_const(
                &mut self,
                _name: &str,
                _sort: &primelift_smt::sorts::Sort,
            ) -> Result<(), primelift_smt::oracle::OracleError> {
                Ok(())
            }

            fn assert_term(
                &mut self,
                _term: &primelift_smt::terms::SmtTerm,
            ) -> Result<(), primelift_smt::oracle::OracleError> {
                Ok(())
            }

            fn reset_assertions(&mut self) -> Result<(), primelift_smt::oracle::OracleError> {
                Ok(())
            }

            fn check_sat(
                &mut self,
            ) -> Result<primelift_smt::oracle::SatOutcome, primelift_smt::oracle::OracleError>
            {
                loop {
                    thread::sleep(Duration::from_millis(50));
                }
            }

            fn get_value(
                &mut self,
                _term: &primelift_smt::terms::SmtTerm,
            ) -> Result<primelift_smt::oracle::Value, primelift_smt::oracle::OracleError> {
                Ok(primelift_smt::oracle::Value::Int(0))
            }
        }

        impl OracleFactory for Stuck {
            fn open(
                &self,
                _time_limit_ms: Option<u64>,
            ) -> Result<Box<dyn primelift_smt::oracle::Oracle>, primelift_smt::oracle::OracleError>
            {
                Ok(Box::new(StuckOracle))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("1.smt2");
        touch(&file, "(declare-const x)(assert (= x 1))");

        let config = SolverConfig {
            file_budget: Some(Duration::from_millis(10)),
            ..SolverConfig::default()
        };
        let result = supervised_solve(&file, &Stuck, &config);
        assert_eq!(result.outcome, Outcome::timeout());
    }
}
