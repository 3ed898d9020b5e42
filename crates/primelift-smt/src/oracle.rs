use thiserror::Error;

use crate::sorts::Sort;
use crate::terms::SmtTerm;

/// Errors surfaced by oracle backends.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("oracle binary not found: {0}")]
    NotFound(String),
    #[error("oracle failure: {0}")]
    Backend(String),
    #[error("failed to parse oracle model value: {0}")]
    ParseValue(String),
}

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatOutcome {
    Sat,
    Unsat,
    /// The backend gave up; the payload is its stated reason.
    Unknown(String),
}

/// A literal value read back from a model after a SAT result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Bits { value: u64, width: u32 },
}

impl Value {
    /// Numeric reading of the value; bitvectors are unsigned.
    pub fn as_int(&self) -> i128 {
        match self {
            Value::Int(n) => *n as i128,
            Value::Bits { value, .. } => *value as i128,
        }
    }
}

/// One live decision-procedure session.
///
/// Declarations persist for the session lifetime; `reset_assertions` clears
/// only the checkable assertion set. `get_value` is meaningful only after a
/// `Sat` answer from `check_sat`.
pub trait Oracle {
    fn declare_const(&mut self, name: &str, sort: &Sort) -> Result<(), OracleError>;

    fn assert_term(&mut self, term: &SmtTerm) -> Result<(), OracleError>;

    fn reset_assertions(&mut self) -> Result<(), OracleError>;

    fn check_sat(&mut self) -> Result<SatOutcome, OracleError>;

    fn get_value(&mut self, term: &SmtTerm) -> Result<Value, OracleError>;

    /// Bound each subsequent `check_sat` call to `ms` milliseconds.
    /// Backends without a per-call limit ignore this.
    fn set_time_limit(&mut self, _ms: u64) -> Result<(), OracleError> {
        Ok(())
    }
}

/// Opens fresh oracle sessions.
///
/// Every input file gets its own sessions so nothing (declarations, modular
/// auxiliaries, assertion sets) can leak across file boundaries.
pub trait OracleFactory {
    /// Open a session whose individual `check_sat` calls are bounded by
    /// `time_limit_ms` when the backend supports per-call limits.
    fn open(&self, time_limit_ms: Option<u64>) -> Result<Box<dyn Oracle>, OracleError>;
}
