//! Unbounded-integer modular encoding.
//!
//! Every declared variable gets an auxiliary integer constant
//! `{var}_mod_{p}` constrained to [0, p); every ring-valued operator
//! application, and every literal leaf, is wrapped with `(mod _ p)` so the
//! translated arithmetic lives in the ring of residues by construction.
//! Predicate nodes (=, <, >, <=, >=) combine their already-reduced operands
//! directly: a Bool cannot be reduced.

use primelift_smt::oracle::Oracle;
use primelift_smt::sorts::Sort;
use primelift_smt::terms::SmtTerm;

use crate::ast::{ConstraintModel, Term};
use crate::encode::{aux_name, int_op, LiteralCache, ModularEncoder};
use crate::errors::SolveError;

#[derive(Debug, Default)]
pub struct IntegerEncoder;

impl IntegerEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ModularEncoder for IntegerEncoder {
    fn encode_round(
        &mut self,
        model: &ConstraintModel,
        prime: i64,
        oracle: &mut dyn Oracle,
        literals: &mut LiteralCache,
    ) -> Result<Vec<SmtTerm>, SolveError> {
        let mut aux_terms = Vec::with_capacity(model.vars.len());
        for var in &model.vars {
            let name = aux_name(var, prime);
            oracle.declare_const(&name, &Sort::Int)?;
            oracle.assert_term(&SmtTerm::var(name.clone()).ge(SmtTerm::int(0)))?;
            oracle.assert_term(&SmtTerm::var(name.clone()).lt(SmtTerm::int(prime)))?;
            aux_terms.push(SmtTerm::var(name));
        }

        for assert in &model.asserts {
            let translated = translate(assert, prime, literals)?;
            oracle.assert_term(&translated)?;
        }
        Ok(aux_terms)
    }
}

fn translate(term: &Term, prime: i64, literals: &mut LiteralCache) -> Result<SmtTerm, SolveError> {
    match term {
        Term::Var(name) => Ok(SmtTerm::var(aux_name(name, prime))),
        Term::Lit(text) => {
            // The literal value is used as-is; the oracle performs the
            // reduction symbolically.
            Ok(SmtTerm::int(literals.get(text)?).modulo(SmtTerm::int(prime)))
        }
        Term::App(op, operands) => {
            let translated = operands
                .iter()
                .map(|operand| translate(operand, prime, literals))
                .collect::<Result<Vec<_>, _>>()?;
            let applied = SmtTerm::app(int_op(*op), translated);
            if op.is_predicate() {
                Ok(applied)
            } else {
                Ok(applied.modulo(SmtTerm::int(prime)))
            }
        }
    }
}
