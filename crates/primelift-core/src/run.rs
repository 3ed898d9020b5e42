//! Per-file solver loop.
//!
//! One file gets two fresh oracle sessions: a modular session that
//! accumulates encoded rounds across the growing prime stream, and a
//! verification session holding the original formula for candidate probes.
//! The loop alternates between growing the modulus (new prime, encode,
//! check, read residues, CRT-combine) and sweeping candidates around the
//! lifted residues. A modular UNSAT is final; a verified candidate is a
//! model; errors and lapsed budgets end the file as UNKNOWN.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use primelift_smt::oracle::{Oracle, OracleFactory, SatOutcome};
use primelift_smt::sorts::Sort;
use primelift_smt::terms::SmtTerm;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ast::ConstraintModel;
use crate::candidate::{CandidateSearcher, SearchOutcome};
use crate::crt::{combine, ModulusState};
use crate::encode::{
    encoder_for, translate_plain, EncodingMode, LiteralCache, SizingPolicy,
};
use crate::errors::SolveError;
use crate::parse::parse_script;
use crate::primes::PrimeStream;

/// Knobs for one run; shared across every file of a batch.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub mode: EncodingMode,
    pub sizing: SizingPolicy,
    /// Per-check-sat limit handed to the oracle backend, in milliseconds.
    /// Once a `file_budget` is set, the limit is further clamped to the
    /// remaining budget before every round.
    pub check_limit_ms: Option<u64>,
    /// Wall-clock budget for the whole file.
    pub file_budget: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            mode: EncodingMode::Bitvector,
            sizing: SizingPolicy::PrimeSquared,
            check_limit_ms: None,
            file_budget: None,
        }
    }
}

/// Why a file ended UNKNOWN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownReason {
    Timeout,
    Error(String),
}

/// Final verdict for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Sat { model: Vec<(String, i64)> },
    Unsat,
    Unknown { reason: UnknownReason },
}

impl Outcome {
    pub fn timeout() -> Self {
        Outcome::Unknown {
            reason: UnknownReason::Timeout,
        }
    }

    pub fn error(message: String) -> Self {
        Outcome::Unknown {
            reason: UnknownReason::Error(message),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Sat { .. } => write!(f, "SAT"),
            Outcome::Unsat => write!(f, "UNSAT"),
            Outcome::Unknown {
                reason: UnknownReason::Timeout,
            } => write!(f, "UNKNOWN (TIMEOUT)"),
            Outcome::Unknown {
                reason: UnknownReason::Error(_),
            } => write!(f, "UNKNOWN (ERROR)"),
        }
    }
}

/// One row of a batch report.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub test: String,
    pub runtime_secs: f64,
    pub outcome: Outcome,
}

/// Read, parse and solve one file. Every failure mode is folded into the
/// returned outcome; a batch never stops on a bad file.
pub fn solve_file(path: &Path, factory: &dyn OracleFactory, config: &SolverConfig) -> RunResult {
    let test = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let started = Instant::now();
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            warn!(file = %test, %err, "unreadable input file");
            return RunResult {
                test,
                runtime_secs: started.elapsed().as_secs_f64(),
                outcome: Outcome::error(err.to_string()),
            };
        }
    };
    let mut result = solve_source(&source, &test, factory, config);
    result.runtime_secs = started.elapsed().as_secs_f64();
    result
}

/// Solve already-loaded source text under `name`.
pub fn solve_source(
    source: &str,
    name: &str,
    factory: &dyn OracleFactory,
    config: &SolverConfig,
) -> RunResult {
    let started = Instant::now();
    let outcome = match parse_script(source, name) {
        Ok(model) => match drive(&model, name, factory, config) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(file = name, %err, "file aborted");
                Outcome::error(err.to_string())
            }
        },
        Err(err) => {
            warn!(file = name, %err, "parse failure");
            Outcome::error(err.to_string())
        }
    };
    info!(file = name, outcome = %outcome, "file finished");
    RunResult {
        test: name.to_string(),
        runtime_secs: started.elapsed().as_secs_f64(),
        outcome,
    }
}

fn drive(
    model: &ConstraintModel,
    name: &str,
    factory: &dyn OracleFactory,
    config: &SolverConfig,
) -> Result<Outcome, SolveError> {
    let deadline = config.file_budget.map(|budget| Instant::now() + budget);

    let open_limit = match deadline {
        Some(deadline) => match remaining_limit_ms(config.check_limit_ms, deadline) {
            Some(ms) => Some(ms),
            None => return Ok(Outcome::timeout()),
        },
        None => config.check_limit_ms,
    };
    let mut modular = factory.open(open_limit)?;
    let mut verify = factory.open(open_limit)?;
    let mut literals = LiteralCache::new();

    // The verification session holds the original unbounded formula; its
    // assertion set is rebuilt per probe but the declarations persist.
    for var in &model.vars {
        verify.declare_const(var, &Sort::Int)?;
    }
    let plain_asserts = model
        .asserts
        .iter()
        .map(|assert| translate_plain(assert, &mut literals))
        .collect::<Result<Vec<SmtTerm>, _>>()?;

    let mut encoder = encoder_for(config.mode, config.sizing);
    let mut primes = PrimeStream::new();
    let mut states: IndexMap<String, ModulusState> = IndexMap::new();

    loop {
        if !reclamp(modular.as_mut(), config.check_limit_ms, deadline)? {
            return Ok(Outcome::timeout());
        }
        let prime = primes.next_prime();
        let aux = encoder.encode_round(model, prime, modular.as_mut(), &mut literals)?;

        match modular.check_sat()? {
            SatOutcome::Unsat => {
                info!(file = name, prime, "modular refutation");
                return Ok(Outcome::Unsat);
            }
            SatOutcome::Unknown(reason) => {
                debug!(file = name, prime, reason = %reason, "modular check gave up");
                return Ok(Outcome::timeout());
            }
            SatOutcome::Sat => {}
        }

        for (var, aux_term) in model.vars.iter().zip(&aux) {
            let residue = modular.get_value(aux_term)?.as_int();
            let state = combine(states.get(var).copied(), prime, residue)?;
            states.insert(var.clone(), state);
        }
        debug!(file = name, prime, ?states, "residues lifted");

        if !reclamp(verify.as_mut(), config.check_limit_ms, deadline)? {
            return Ok(Outcome::timeout());
        }
        let searcher = CandidateSearcher::new(&states, prime, &plain_asserts);
        match searcher.search(verify.as_mut(), deadline)? {
            SearchOutcome::Found(model) => {
                info!(file = name, prime, "candidate verified");
                return Ok(Outcome::Sat { model });
            }
            SearchOutcome::DeadlineExceeded => return Ok(Outcome::timeout()),
            SearchOutcome::Exhausted => {
                debug!(file = name, prime, "candidate sweep exhausted");
            }
        }
    }
}

/// Per-call limit for the next oracle call: the configured limit clamped to
/// the whole milliseconds left before the deadline. `None` once the budget
/// has lapsed.
fn remaining_limit_ms(check_limit_ms: Option<u64>, deadline: Instant) -> Option<u64> {
    let remaining = deadline
        .saturating_duration_since(Instant::now())
        .as_millis() as u64;
    if remaining == 0 {
        return None;
    }
    Some(check_limit_ms.map_or(remaining, |limit| limit.min(remaining)))
}

/// Tighten the session's per-call limit to the remaining budget. Returns
/// false once the budget has lapsed. Without a deadline the limit set at
/// open stands.
fn reclamp(
    oracle: &mut dyn Oracle,
    check_limit_ms: Option<u64>,
    deadline: Option<Instant>,
) -> Result<bool, SolveError> {
    let Some(deadline) = deadline else {
        return Ok(true);
    };
    match remaining_limit_ms(check_limit_ms, deadline) {
        Some(ms) => {
            oracle.set_time_limit(ms)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
