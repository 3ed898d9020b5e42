use thiserror::Error;

use primelift_smt::oracle::OracleError;

/// Failures that abort the current file (never the batch).
///
/// Every variant maps to an UNKNOWN (ERROR) outcome at the file boundary;
/// nothing here silently truncates a value.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("literal `{0}` exceeds the representable integer range")]
    LiteralOverflow(String),

    #[error(
        "bitwidth sizing cannot represent (p-1)^{fanin} for prime {prime} \
         within 31 bits; use a wider integer representation"
    )]
    WidthExceeded { prime: i64, fanin: usize },

    #[error("combined modulus grew past the representable range")]
    ModulusOverflow,

    #[error("candidate value {0} exceeds the oracle's integer literal range")]
    CandidateOverflow(i128),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}
