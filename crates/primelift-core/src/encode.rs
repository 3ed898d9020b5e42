//! Modular constraint encoding.
//!
//! Two interchangeable strategies translate the original formula into an
//! equisatisfiable formula over residues modulo the current prime: one over
//! unbounded integers with explicit `mod` reduction, one over a fixed-width
//! unsigned bitvector ring. Exactly one strategy is active per run, chosen
//! at configuration time.

pub mod bitvector;
pub mod integer;
pub mod width;

use std::collections::HashMap;

use primelift_smt::oracle::Oracle;
use primelift_smt::terms::{SmtOp, SmtTerm};

use crate::ast::{ConstraintModel, OpTag, Term};
use crate::errors::SolveError;

pub use bitvector::BitvectorEncoder;
pub use integer::IntegerEncoder;
pub use width::SizingPolicy;

/// Which modular representation a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    Integer,
    Bitvector,
}

pub fn encoder_for(mode: EncodingMode, sizing: SizingPolicy) -> Box<dyn ModularEncoder> {
    match mode {
        EncodingMode::Integer => Box::new(IntegerEncoder::new()),
        EncodingMode::Bitvector => Box::new(BitvectorEncoder::new(sizing)),
    }
}

/// One round of modular encoding.
///
/// `encode_round` declares this prime's auxiliary `{var}_mod_{prime}`
/// constants on the oracle, asserts their range constraints and the
/// translated assertions, and returns one auxiliary term per declared
/// variable in declaration order (for residue read-back). Assertions from
/// earlier rounds are never reset; each round only adds constraints over its
/// own fresh auxiliaries.
pub trait ModularEncoder {
    fn encode_round(
        &mut self,
        model: &ConstraintModel,
        prime: i64,
        oracle: &mut dyn Oracle,
        literals: &mut LiteralCache,
    ) -> Result<Vec<SmtTerm>, SolveError>;
}

/// Checked literal-text to integer conversion, cached by literal value.
///
/// A literal that does not fit the host integer range aborts the file; the
/// cache guarantees the conversion (and the abort decision) happens once
/// per distinct literal.
#[derive(Debug, Default)]
pub struct LiteralCache {
    map: HashMap<String, i64>,
}

impl LiteralCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, text: &str) -> Result<i64, SolveError> {
        if let Some(value) = self.map.get(text) {
            return Ok(*value);
        }
        let value: i64 = text
            .parse()
            .map_err(|_| SolveError::LiteralOverflow(text.to_string()))?;
        self.map.insert(text.to_string(), value);
        Ok(value)
    }
}

/// Auxiliary constant name for a variable's residue at a prime.
pub fn aux_name(var: &str, prime: i64) -> String {
    format!("{var}_mod_{prime}")
}

pub(crate) fn int_op(tag: OpTag) -> SmtOp {
    match tag {
        OpTag::Eq => SmtOp::Eq,
        OpTag::Add => SmtOp::Add,
        OpTag::Sub => SmtOp::Sub,
        OpTag::Mul => SmtOp::Mul,
        OpTag::Gt => SmtOp::Gt,
        OpTag::Lt => SmtOp::Lt,
        OpTag::Ge => SmtOp::Ge,
        OpTag::Le => SmtOp::Le,
    }
}

pub(crate) fn bv_op(tag: OpTag) -> SmtOp {
    match tag {
        OpTag::Eq => SmtOp::Eq,
        OpTag::Add => SmtOp::BvAdd,
        OpTag::Sub => SmtOp::BvSub,
        OpTag::Mul => SmtOp::BvMul,
        OpTag::Gt => SmtOp::BvUgt,
        OpTag::Lt => SmtOp::BvUlt,
        OpTag::Ge => SmtOp::BvUge,
        OpTag::Le => SmtOp::BvUle,
    }
}

/// Translate an original (unbounded) assertion verbatim: variables map to
/// themselves, literals to checked integer constants. Used for candidate
/// verification against the original formula.
pub fn translate_plain(term: &Term, literals: &mut LiteralCache) -> Result<SmtTerm, SolveError> {
    match term {
        Term::Var(name) => Ok(SmtTerm::var(name.clone())),
        Term::Lit(text) => Ok(SmtTerm::int(literals.get(text)?)),
        Term::App(op, operands) => {
            let translated = operands
                .iter()
                .map(|operand| translate_plain(operand, literals))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(SmtTerm::app(int_op(*op), translated))
        }
    }
}
