//! Results artifacts: the batch CSV and the optional JSON dump.

use std::fs;
use std::io;
use std::path::Path;

use miette::IntoDiagnostic;
use primelift_core::run::{Outcome, RunResult, UnknownReason};

/// Write one row per run plus a trailing totals row.
///
/// Columns are `test, runtime_secs, outcome, model`; the totals row counts
/// outcomes and sums runtime so a batch is summarized without post-processing.
pub(crate) fn write_csv(path: &Path, results: &[RunResult]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out = String::from("test,runtime_secs,outcome,model\n");
    let mut sat = 0usize;
    let mut unsat = 0usize;
    let mut unknown = 0usize;
    let mut total_runtime = 0.0f64;
    for result in results {
        match &result.outcome {
            Outcome::Sat { .. } => sat += 1,
            Outcome::Unsat => unsat += 1,
            Outcome::Unknown { .. } => unknown += 1,
        }
        total_runtime += result.runtime_secs;
        out.push_str(&format!(
            "{},{:.6},{},{}\n",
            escape(&result.test),
            result.runtime_secs,
            result.outcome,
            escape(&render_model(&result.outcome)),
        ));
    }
    out.push_str(&format!(
        "Total: {},Total: {:.6},{},\n",
        results.len(),
        total_runtime,
        escape(&format!("Total: {sat} SAT, {unsat} UNSAT, {unknown} UNKNOWN")),
    ));

    fs::write(path, out)
}

/// Pretty-printed JSON of every run, for scripts that want more than the
/// CSV carries (per-variable models, unknown reasons).
pub(crate) fn write_json_artifact(path: &Path, results: &[RunResult]) -> miette::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    fs::write(
        path,
        serde_json::to_string_pretty(results).into_diagnostic()?,
    )
    .into_diagnostic()?;
    Ok(())
}

pub(crate) fn render_model(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Sat { model } => model
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
        Outcome::Unsat => String::new(),
        Outcome::Unknown {
            reason: UnknownReason::Error(message),
        } => message.clone(),
        Outcome::Unknown { .. } => String::new(),
    }
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(test: &str, runtime_secs: f64, outcome: Outcome) -> RunResult {
        RunResult {
            test: test.to_string(),
            runtime_secs,
            outcome,
        }
    }

    #[test]
    fn csv_rows_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let results = vec![
            result(
                "1.smt2",
                0.25,
                Outcome::Sat {
                    model: vec![("x".into(), 7), ("y".into(), 3)],
                },
            ),
            result("2.smt2", 0.5, Outcome::Unsat),
            result("3.smt2", 1.0, Outcome::timeout()),
        ];
        write_csv(&path, &results).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "test,runtime_secs,outcome,model");
        assert_eq!(lines[1], "1.smt2,0.250000,SAT,x=7; y=3");
        assert_eq!(lines[2], "2.smt2,0.500000,UNSAT,");
        assert_eq!(lines[3], "3.smt2,1.000000,UNKNOWN (TIMEOUT),");
        assert_eq!(
            lines[4],
            "Total: 3,Total: 1.750000,\"Total: 1 SAT, 1 UNSAT, 1 UNKNOWN\","
        );
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn json_artifact_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("runs.json");
        let results = vec![result("1.smt2", 0.1, Outcome::Unsat)];
        write_json_artifact(&path, &results).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["test"], "1.smt2");
        assert_eq!(value[0]["outcome"]["status"], "unsat");
    }
}
