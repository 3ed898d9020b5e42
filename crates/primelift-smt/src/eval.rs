//! In-process oracle deciding small ground formulas by bounded exhaustive
//! search.
//!
//! This backs the test suites (the solver loop can run end-to-end without a
//! cvc5 binary) and doubles as a reference for the SMT-LIB semantics the
//! printer relies on: chainable `=`/comparisons, n-ary `+ - *`, Euclidean
//! `mod`, wrapping bitvector arithmetic and `bvurem`.
//!
//! The search domain for an integer constant is mined from the assertion
//! set where possible (equality pins, `0 <= v < p` style range bounds) and
//! otherwise falls back to `-bound..=bound` plus every integer literal in
//! the assertions. An `Unsat` answer therefore only means "unsatisfiable
//! within the searched domain", which is acceptable for a test oracle but
//! unsound as a production backend.

use std::collections::HashMap;

use crate::oracle::{Oracle, OracleError, OracleFactory, SatOutcome, Value};
use crate::sorts::Sort;
use crate::terms::{SmtOp, SmtTerm};

const MAX_CANDIDATES: u128 = 4_000_000;
const MAX_BV_WIDTH: u32 = 16;

pub struct ExhaustiveOracle {
    bound: i64,
    vars: Vec<(String, Sort)>,
    asserts: Vec<SmtTerm>,
    model: Option<HashMap<String, Value>>,
}

impl ExhaustiveOracle {
    pub fn new(bound: i64) -> Self {
        Self {
            bound,
            vars: Vec::new(),
            asserts: Vec::new(),
            model: None,
        }
    }

    fn domain_for(&self, name: &str, sort: &Sort) -> Result<Vec<Value>, SatOutcome> {
        match sort {
            Sort::BitVec(width) => {
                if *width > MAX_BV_WIDTH {
                    return Err(SatOutcome::Unknown(format!(
                        "bitvector width {width} exceeds exhaustive-search limit"
                    )));
                }
                let span = 1u64 << width;
                let cap = self
                    .mined_bv_bound(name)
                    .map_or(span, |upper| upper.min(span));
                Ok((0..cap)
                    .map(|value| Value::Bits {
                        value,
                        width: *width,
                    })
                    .collect())
            }
            Sort::Int => {
                if let Some(pins) = self.mined_int_pins(name) {
                    return Ok(pins.into_iter().map(Value::Int).collect());
                }
                if let Some((lo, hi)) = self.mined_int_range(name) {
                    return Ok((lo..hi).map(Value::Int).collect());
                }
                let mut values: Vec<i64> = (-self.bound..=self.bound).collect();
                for assert in &self.asserts {
                    collect_int_literals(assert, &mut values);
                }
                values.sort_unstable();
                values.dedup();
                Ok(values.into_iter().map(Value::Int).collect())
            }
        }
    }

    /// `(bvult v #b...)` upper bound, if asserted.
    fn mined_bv_bound(&self, name: &str) -> Option<u64> {
        self.asserts.iter().find_map(|t| match t {
            SmtTerm::App(SmtOp::BvUlt, operands) => match operands.as_slice() {
                [SmtTerm::Var(v), SmtTerm::BvLit { value, .. }] if v == name => Some(*value),
                _ => None,
            },
            _ => None,
        })
    }

    /// `(= v c)` pins, if asserted.
    fn mined_int_pins(&self, name: &str) -> Option<Vec<i64>> {
        let pins: Vec<i64> = self
            .asserts
            .iter()
            .filter_map(|t| match t {
                SmtTerm::App(SmtOp::Eq, operands) => match operands.as_slice() {
                    [SmtTerm::Var(v), SmtTerm::IntLit(c)] if v == name => Some(*c),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        if pins.is_empty() {
            None
        } else {
            Some(pins)
        }
    }

    /// `(>= v lo)` and `(< v hi)` range, if both asserted.
    fn mined_int_range(&self, name: &str) -> Option<(i64, i64)> {
        let lo = self.asserts.iter().find_map(|t| match t {
            SmtTerm::App(SmtOp::Ge, operands) => match operands.as_slice() {
                [SmtTerm::Var(v), SmtTerm::IntLit(c)] if v == name => Some(*c),
                _ => None,
            },
            _ => None,
        })?;
        let hi = self.asserts.iter().find_map(|t| match t {
            SmtTerm::App(SmtOp::Lt, operands) => match operands.as_slice() {
                [SmtTerm::Var(v), SmtTerm::IntLit(c)] if v == name => Some(*c),
                _ => None,
            },
            _ => None,
        })?;
        Some((lo, hi))
    }

    fn search(&self) -> Result<Option<HashMap<String, Value>>, SatOutcome> {
        let mut domains = Vec::with_capacity(self.vars.len());
        let mut total: u128 = 1;
        for (name, sort) in &self.vars {
            let domain = self.domain_for(name, sort)?;
            if domain.is_empty() {
                return Ok(None);
            }
            total = total.saturating_mul(domain.len() as u128);
            domains.push(domain);
        }
        if total > MAX_CANDIDATES {
            return Err(SatOutcome::Unknown(format!(
                "search space of {total} assignments exceeds exhaustive-search budget"
            )));
        }

        let mut env: HashMap<String, Value> = HashMap::new();
        let mut cursor = vec![0usize; domains.len()];
        loop {
            for (idx, (name, _)) in self.vars.iter().enumerate() {
                env.insert(name.clone(), domains[idx][cursor[idx]]);
            }
            if self.satisfied(&env)? {
                return Ok(Some(env));
            }
            // Odometer advance, last variable fastest.
            let mut pos = domains.len();
            loop {
                if pos == 0 {
                    return Ok(None);
                }
                pos -= 1;
                cursor[pos] += 1;
                if cursor[pos] < domains[pos].len() {
                    break;
                }
                cursor[pos] = 0;
            }
        }
    }

    fn satisfied(&self, env: &HashMap<String, Value>) -> Result<bool, SatOutcome> {
        for assert in &self.asserts {
            match eval_term(assert, env) {
                Ok(Evaled::Bool(true)) => {}
                Ok(Evaled::Bool(false)) => return Ok(false),
                Ok(_) => {
                    return Err(SatOutcome::Unknown(
                        "asserted term is not a predicate".into(),
                    ))
                }
                Err(reason) => return Err(SatOutcome::Unknown(reason)),
            }
        }
        Ok(true)
    }
}

impl Oracle for ExhaustiveOracle {
    fn declare_const(&mut self, name: &str, sort: &Sort) -> Result<(), OracleError> {
        if !self.vars.iter().any(|(v, _)| v == name) {
            self.vars.push((name.to_string(), sort.clone()));
        }
        Ok(())
    }

    fn assert_term(&mut self, term: &SmtTerm) -> Result<(), OracleError> {
        self.asserts.push(term.clone());
        Ok(())
    }

    fn reset_assertions(&mut self) -> Result<(), OracleError> {
        self.asserts.clear();
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatOutcome, OracleError> {
        self.model = None;
        match self.search() {
            Ok(Some(model)) => {
                self.model = Some(model);
                Ok(SatOutcome::Sat)
            }
            Ok(None) => Ok(SatOutcome::Unsat),
            Err(unknown) => Ok(unknown),
        }
    }

    fn get_value(&mut self, term: &SmtTerm) -> Result<Value, OracleError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| OracleError::Backend("get-value without a prior sat answer".into()))?;
        match term {
            SmtTerm::Var(name) => model
                .get(name)
                .copied()
                .ok_or_else(|| OracleError::ParseValue(format!("undeclared constant {name}"))),
            other => match eval_term(other, model) {
                Ok(Evaled::Int(n)) => i64::try_from(n)
                    .map(Value::Int)
                    .map_err(|_| OracleError::ParseValue("value out of i64 range".into())),
                Ok(Evaled::Bits { value, width }) => Ok(Value::Bits { value, width }),
                Ok(Evaled::Bool(_)) => {
                    Err(OracleError::ParseValue("boolean model value".into()))
                }
                Err(reason) => Err(OracleError::ParseValue(reason)),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Evaled {
    Int(i128),
    Bits { value: u64, width: u32 },
    Bool(bool),
}

impl Evaled {
    fn numeric(self) -> Result<i128, String> {
        match self {
            Evaled::Int(n) => Ok(n),
            Evaled::Bits { value, .. } => Ok(value as i128),
            Evaled::Bool(_) => Err("expected a numeric term".into()),
        }
    }
}

fn eval_term(term: &SmtTerm, env: &HashMap<String, Value>) -> Result<Evaled, String> {
    match term {
        SmtTerm::Var(name) => match env.get(name) {
            Some(Value::Int(n)) => Ok(Evaled::Int(*n as i128)),
            Some(Value::Bits { value, width }) => Ok(Evaled::Bits {
                value: *value,
                width: *width,
            }),
            None => Err(format!("unbound constant {name}")),
        },
        SmtTerm::IntLit(n) => Ok(Evaled::Int(*n as i128)),
        SmtTerm::BvLit { value, width } => Ok(Evaled::Bits {
            value: *value,
            width: *width,
        }),
        SmtTerm::App(op, operands) => {
            let args: Vec<Evaled> = operands
                .iter()
                .map(|t| eval_term(t, env))
                .collect::<Result<_, _>>()?;
            apply(*op, &args)
        }
    }
}

fn apply(op: SmtOp, args: &[Evaled]) -> Result<Evaled, String> {
    if args.len() < 2 {
        return Err(format!("operator {} needs at least two operands", op.symbol()));
    }
    match op {
        SmtOp::Eq => {
            let all_equal = args.windows(2).try_fold(true, |acc, pair| {
                Ok::<bool, String>(acc && pair[0].numeric()? == pair[1].numeric()?)
            })?;
            Ok(Evaled::Bool(all_equal))
        }
        SmtOp::Gt | SmtOp::Lt | SmtOp::Ge | SmtOp::Le => chained_compare(op, args),
        SmtOp::BvUgt | SmtOp::BvUlt | SmtOp::BvUge | SmtOp::BvUle => chained_compare(op, args),
        SmtOp::Add => {
            let mut acc = 0i128;
            for a in args {
                acc = acc
                    .checked_add(a.numeric()?)
                    .ok_or("integer overflow in evaluation")?;
            }
            Ok(Evaled::Int(acc))
        }
        SmtOp::Sub => {
            let mut acc = args[0].numeric()?;
            for a in &args[1..] {
                acc = acc
                    .checked_sub(a.numeric()?)
                    .ok_or("integer overflow in evaluation")?;
            }
            Ok(Evaled::Int(acc))
        }
        SmtOp::Mul => {
            let mut acc = 1i128;
            for a in args {
                acc = acc
                    .checked_mul(a.numeric()?)
                    .ok_or("integer overflow in evaluation")?;
            }
            Ok(Evaled::Int(acc))
        }
        SmtOp::Mod => {
            let lhs = args[0].numeric()?;
            let rhs = args[1].numeric()?;
            if rhs == 0 {
                return Err("mod by zero".into());
            }
            Ok(Evaled::Int(lhs.rem_euclid(rhs)))
        }
        SmtOp::BvAdd | SmtOp::BvSub | SmtOp::BvMul => {
            let width = bv_width(args)?;
            let mask = mask_for(width);
            let mut acc = args[0].numeric()? as u64 & mask;
            for a in &args[1..] {
                let rhs = a.numeric()? as u64 & mask;
                acc = match op {
                    SmtOp::BvAdd => acc.wrapping_add(rhs),
                    SmtOp::BvSub => acc.wrapping_sub(rhs),
                    _ => acc.wrapping_mul(rhs),
                } & mask;
            }
            Ok(Evaled::Bits { value: acc, width })
        }
        SmtOp::BvUrem => {
            let width = bv_width(args)?;
            let mask = mask_for(width);
            let lhs = args[0].numeric()? as u64 & mask;
            let rhs = args[1].numeric()? as u64 & mask;
            // SMT-LIB: bvurem by zero yields the dividend.
            let value = if rhs == 0 { lhs } else { lhs % rhs };
            Ok(Evaled::Bits { value, width })
        }
    }
}

fn chained_compare(op: SmtOp, args: &[Evaled]) -> Result<Evaled, String> {
    let mut holds = true;
    for pair in args.windows(2) {
        let (a, b) = (pair[0].numeric()?, pair[1].numeric()?);
        holds &= match op {
            SmtOp::Gt | SmtOp::BvUgt => a > b,
            SmtOp::Lt | SmtOp::BvUlt => a < b,
            SmtOp::Ge | SmtOp::BvUge => a >= b,
            SmtOp::Le | SmtOp::BvUle => a <= b,
            _ => unreachable!(),
        };
    }
    Ok(Evaled::Bool(holds))
}

fn bv_width(args: &[Evaled]) -> Result<u32, String> {
    args.iter()
        .find_map(|a| match a {
            Evaled::Bits { width, .. } => Some(*width),
            _ => None,
        })
        .ok_or_else(|| "bitvector operation without bitvector operands".into())
}

fn mask_for(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Opens fresh [`ExhaustiveOracle`] sessions.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveFactory {
    pub bound: i64,
}

impl ExhaustiveFactory {
    pub fn new(bound: i64) -> Self {
        Self { bound }
    }
}

impl Default for ExhaustiveFactory {
    fn default() -> Self {
        Self::new(16)
    }
}

impl OracleFactory for ExhaustiveFactory {
    fn open(&self, _time_limit_ms: Option<u64>) -> Result<Box<dyn Oracle>, OracleError> {
        Ok(Box::new(ExhaustiveOracle::new(self.bound)))
    }
}

fn collect_int_literals(term: &SmtTerm, out: &mut Vec<i64>) {
    match term {
        SmtTerm::IntLit(n) => out.push(*n),
        SmtTerm::App(_, operands) => {
            for operand in operands {
                collect_int_literals(operand, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_var(name: &str) -> SmtTerm {
        SmtTerm::var(name)
    }

    #[test]
    fn decides_pinned_equality() {
        let mut oracle = ExhaustiveOracle::new(4);
        oracle.declare_const("x", &Sort::Int).unwrap();
        oracle
            .assert_term(&int_var("x").eq(SmtTerm::int(7)))
            .unwrap();
        assert_eq!(oracle.check_sat().unwrap(), SatOutcome::Sat);
        assert_eq!(
            oracle.get_value(&int_var("x")).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn decides_linear_system() {
        let mut oracle = ExhaustiveOracle::new(12);
        oracle.declare_const("x", &Sort::Int).unwrap();
        oracle.declare_const("y", &Sort::Int).unwrap();
        let sum = SmtTerm::app(SmtOp::Add, vec![int_var("x"), int_var("y")]).eq(SmtTerm::int(10));
        let diff = SmtTerm::app(SmtOp::Sub, vec![int_var("x"), int_var("y")]).eq(SmtTerm::int(4));
        oracle.assert_term(&sum).unwrap();
        oracle.assert_term(&diff).unwrap();
        assert_eq!(oracle.check_sat().unwrap(), SatOutcome::Sat);
        assert_eq!(oracle.get_value(&int_var("x")).unwrap(), Value::Int(7));
        assert_eq!(oracle.get_value(&int_var("y")).unwrap(), Value::Int(3));
    }

    #[test]
    fn reports_unsat_for_conflicting_pins() {
        let mut oracle = ExhaustiveOracle::new(4);
        oracle.declare_const("x", &Sort::Int).unwrap();
        oracle
            .assert_term(&int_var("x").eq(SmtTerm::int(1)))
            .unwrap();
        oracle
            .assert_term(&int_var("x").eq(SmtTerm::int(2)))
            .unwrap();
        assert_eq!(oracle.check_sat().unwrap(), SatOutcome::Unsat);
    }

    #[test]
    fn reset_assertions_keeps_declarations() {
        let mut oracle = ExhaustiveOracle::new(4);
        oracle.declare_const("x", &Sort::Int).unwrap();
        oracle
            .assert_term(&int_var("x").eq(SmtTerm::int(1)))
            .unwrap();
        oracle.reset_assertions().unwrap();
        oracle
            .assert_term(&int_var("x").eq(SmtTerm::int(3)))
            .unwrap();
        assert_eq!(oracle.check_sat().unwrap(), SatOutcome::Sat);
        assert_eq!(oracle.get_value(&int_var("x")).unwrap(), Value::Int(3));
    }

    #[test]
    fn evaluates_euclidean_mod() {
        let env = HashMap::new();
        let t = SmtTerm::int(-7).modulo(SmtTerm::int(3));
        assert_eq!(eval_term(&t, &env).unwrap(), Evaled::Int(2));
    }

    #[test]
    fn evaluates_wrapping_bitvector_ring() {
        let env = HashMap::new();
        let t = SmtTerm::app(SmtOp::BvMul, vec![SmtTerm::bv(3, 3), SmtTerm::bv(5, 3)]);
        // 15 mod 8 = 7
        assert_eq!(
            eval_term(&t, &env).unwrap(),
            Evaled::Bits { value: 7, width: 3 }
        );
        let r = SmtTerm::bv(6, 3).bv_urem(SmtTerm::bv(5, 3));
        assert_eq!(
            eval_term(&r, &env).unwrap(),
            Evaled::Bits { value: 1, width: 3 }
        );
    }

    #[test]
    fn respects_mined_bitvector_bounds() {
        let mut oracle = ExhaustiveOracle::new(4);
        oracle.declare_const("v", &Sort::BitVec(4)).unwrap();
        oracle
            .assert_term(&int_var("v").bv_ult(SmtTerm::bv(3, 4)))
            .unwrap();
        assert_eq!(oracle.check_sat().unwrap(), SatOutcome::Sat);
        match oracle.get_value(&int_var("v")).unwrap() {
            Value::Bits { value, .. } => assert!(value < 3),
            other => panic!("unexpected model value {other:?}"),
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// `mod` is Euclidean: the result is a canonical residue of the
            /// dividend for any divisor sign or magnitude.
            #[test]
            fn modulo_yields_canonical_residues(a in -10_000i64..10_000, p in 1i64..100) {
                let env = HashMap::new();
                let t = SmtTerm::int(a).modulo(SmtTerm::int(p));
                let Evaled::Int(r) = eval_term(&t, &env).unwrap() else {
                    panic!("mod did not evaluate to an integer");
                };
                prop_assert!(r >= 0);
                prop_assert!(r < i128::from(p));
                prop_assert_eq!((i128::from(a) - r).rem_euclid(i128::from(p)), 0);
            }

            /// Bitvector products agree with integer arithmetic reduced at
            /// the ring width.
            #[test]
            fn bv_multiplication_wraps_at_the_width(
                a in 0u64..256,
                b in 0u64..256,
                width in 4u32..12,
            ) {
                let env = HashMap::new();
                let mask = (1u64 << width) - 1;
                let t = SmtTerm::app(
                    SmtOp::BvMul,
                    vec![SmtTerm::bv(a & mask, width), SmtTerm::bv(b & mask, width)],
                );
                let expected = ((a & mask) as u128 * (b & mask) as u128 % (1u128 << width)) as u64;
                prop_assert_eq!(
                    eval_term(&t, &env).unwrap(),
                    Evaled::Bits { value: expected, width }
                );
            }
        }
    }
}
