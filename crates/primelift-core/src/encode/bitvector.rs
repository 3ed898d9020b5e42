//! Fixed-width bitvector modular encoding.
//!
//! Same recursive translation as the integer strategy, but the ring is an
//! n-bit unsigned bitvector ring: the reduction after each ring operator
//! is `bvurem` against a bitvector constant for p, literals are
//! pre-reduced mod p by ordinary integer arithmetic before becoming n-bit
//! constants (decoupling literal size from n), and multiplication chains
//! pairwise multiply-then-reduce so no intermediate product outgrows n
//! bits. Fixed-width encodings are typically decided faster than unbounded
//! integers with explicit modulus constraints, at the cost of this
//! bookkeeping.

use primelift_smt::oracle::Oracle;
use primelift_smt::sorts::Sort;
use primelift_smt::terms::{SmtOp, SmtTerm};

use crate::ast::{ConstraintModel, OpTag, Term};
use crate::encode::{aux_name, bv_op, LiteralCache, ModularEncoder, SizingPolicy};
use crate::errors::SolveError;

#[derive(Debug)]
pub struct BitvectorEncoder {
    sizing: SizingPolicy,
    max_fanin: Option<usize>,
}

impl BitvectorEncoder {
    pub fn new(sizing: SizingPolicy) -> Self {
        Self {
            sizing,
            max_fanin: None,
        }
    }
}

impl ModularEncoder for BitvectorEncoder {
    fn encode_round(
        &mut self,
        model: &ConstraintModel,
        prime: i64,
        oracle: &mut dyn Oracle,
        literals: &mut LiteralCache,
    ) -> Result<Vec<SmtTerm>, SolveError> {
        // The fan-in depends only on the formula; scan it once per file.
        let max_fanin = *self
            .max_fanin
            .get_or_insert_with(|| model.max_mul_fanin());
        let width = self.sizing.bitwidth(prime, max_fanin)?;
        let prime_bv = SmtTerm::bv(prime as u64, width);

        let mut aux_terms = Vec::with_capacity(model.vars.len());
        for var in &model.vars {
            let name = aux_name(var, prime);
            oracle.declare_const(&name, &Sort::BitVec(width))?;
            oracle.assert_term(&SmtTerm::var(name.clone()).bv_ult(prime_bv.clone()))?;
            aux_terms.push(SmtTerm::var(name));
        }

        let ring = Ring {
            prime,
            width,
            prime_bv,
        };
        for assert in &model.asserts {
            let translated = ring.translate(assert, literals)?;
            oracle.assert_term(&translated)?;
        }
        Ok(aux_terms)
    }
}

struct Ring {
    prime: i64,
    width: u32,
    prime_bv: SmtTerm,
}

impl Ring {
    fn translate(&self, term: &Term, literals: &mut LiteralCache) -> Result<SmtTerm, SolveError> {
        match term {
            Term::Var(name) => Ok(SmtTerm::var(aux_name(name, self.prime))),
            Term::Lit(text) => {
                let reduced = literals.get(text)?.rem_euclid(self.prime);
                Ok(SmtTerm::bv(reduced as u64, self.width))
            }
            Term::App(op, operands) => {
                let translated = operands
                    .iter()
                    .map(|operand| self.translate(operand, literals))
                    .collect::<Result<Vec<_>, _>>()?;
                match op {
                    OpTag::Eq => Ok(SmtTerm::app(SmtOp::Eq, translated)),
                    OpTag::Mul => Ok(self.chained_mul(translated)),
                    op if op.is_predicate() => Ok(SmtTerm::app(bv_op(*op), translated)),
                    ring => Ok(SmtTerm::app(bv_op(*ring), translated)
                        .bv_urem(self.prime_bv.clone())),
                }
            }
        }
    }

    /// Pairwise multiply-then-reduce: every intermediate product is of two
    /// residues below p, so it fits the sized ring before the next step.
    fn chained_mul(&self, operands: Vec<SmtTerm>) -> SmtTerm {
        let mut operands = operands.into_iter();
        // Parsing enforces arity >= 2, so the fold runs at least once and
        // the result is always a reduced product.
        let seed = operands.next().unwrap_or_else(|| self.prime_bv.clone());
        operands.fold(seed, |product, operand| {
            SmtTerm::app(SmtOp::BvMul, vec![product, operand]).bv_urem(self.prime_bv.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::test_support::Recorder;
    use crate::parse::parse_script;

    fn encode(src: &str, prime: i64, sizing: SizingPolicy) -> (Recorder, Vec<SmtTerm>, u32) {
        let model = parse_script(src, "t.smt2").unwrap();
        let mut oracle = Recorder::default();
        let mut literals = LiteralCache::new();
        let mut encoder = BitvectorEncoder::new(sizing);
        let aux = encoder
            .encode_round(&model, prime, &mut oracle, &mut literals)
            .unwrap();
        let width = match &oracle.declared[0].1 {
            Sort::BitVec(w) => *w,
            other => panic!("expected bitvector sort, got {other}"),
        };
        (oracle, aux, width)
    }

    #[test]
    fn declares_width_sized_auxiliaries_below_prime() {
        let (oracle, aux, width) = encode(
            "(declare-const x)(assert (= x 7))",
            5,
            SizingPolicy::PrimeSquared,
        );
        assert_eq!(width, 5);
        assert_eq!(aux, vec![SmtTerm::var("x_mod_5")]);
        assert_eq!(
            oracle.asserted[0],
            SmtTerm::var("x_mod_5").bv_ult(SmtTerm::bv(5, 5))
        );
    }

    #[test]
    fn literals_are_reduced_before_conversion() {
        let (oracle, _, width) = encode(
            "(declare-const x)(assert (= x 7))",
            5,
            SizingPolicy::PrimeSquared,
        );
        // 7 mod 5 = 2, as an n-bit constant rather than a wrapped literal.
        assert_eq!(
            *oracle.asserted.last().unwrap(),
            SmtTerm::var("x_mod_5").eq(SmtTerm::bv(2, width))
        );
    }

    #[test]
    fn negative_literals_reduce_to_canonical_residues() {
        let (oracle, _, width) = encode(
            "(declare-const x)(assert (= x -3))",
            5,
            SizingPolicy::PrimeSquared,
        );
        assert_eq!(
            *oracle.asserted.last().unwrap(),
            SmtTerm::var("x_mod_5").eq(SmtTerm::bv(2, width))
        );
    }

    #[test]
    fn wide_multiplications_chain_pairwise() {
        let (oracle, _, width) = encode(
            "(declare-const x)(declare-const y)(declare-const z)\
             (assert (= (* x y z) 1))",
            3,
            SizingPolicy::MulFanIn,
        );
        let prime_bv = SmtTerm::bv(3, width);
        let inner = SmtTerm::app(
            SmtOp::BvMul,
            vec![SmtTerm::var("x_mod_3"), SmtTerm::var("y_mod_3")],
        )
        .bv_urem(prime_bv.clone());
        let chained = SmtTerm::app(SmtOp::BvMul, vec![inner, SmtTerm::var("z_mod_3")])
            .bv_urem(prime_bv);
        assert_eq!(
            *oracle.asserted.last().unwrap(),
            chained.eq(SmtTerm::bv(1, width))
        );
    }

    #[test]
    fn comparisons_use_unsigned_bitvector_operators() {
        let (oracle, _, width) = encode(
            "(declare-const x)(assert (< x 2))",
            3,
            SizingPolicy::PrimeSquared,
        );
        assert_eq!(
            *oracle.asserted.last().unwrap(),
            SmtTerm::app(
                SmtOp::BvUlt,
                vec![SmtTerm::var("x_mod_3"), SmtTerm::bv(2, width)]
            )
        );
    }
}
