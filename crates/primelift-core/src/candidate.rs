//! Candidate enumeration and verification against the original formula.
//!
//! A satisfying modular assignment pins each variable to a residue modulo
//! the combined modulus M, but the integer solution (if one exists) may sit
//! a few multiples of the latest prime away from the canonical lift. The
//! searcher therefore probes the Cartesian product of per-variable offsets
//! {0, -p, +p, -2p, +2p} around each lifted residue, asking the
//! verification oracle whether the original formula holds at each point.
//! The first confirmed candidate wins; the product is walked with the
//! first-declared variable varying slowest.

use std::time::Instant;

use indexmap::IndexMap;
use primelift_smt::oracle::{Oracle, SatOutcome};
use primelift_smt::terms::SmtTerm;
use tracing::debug;

use crate::crt::ModulusState;
use crate::errors::SolveError;

/// Offset multipliers applied to the latest prime, in probe order.
const OFFSET_STEPS: [i128; 5] = [0, -1, 1, -2, 2];

/// Result of one candidate sweep at the current modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A candidate satisfied the original formula; holds the model in
    /// variable declaration order.
    Found(Vec<(String, i64)>),
    /// Every offset combination was refuted; the caller should grow the
    /// modulus and try again.
    Exhausted,
    /// The wall-clock budget lapsed mid-sweep.
    DeadlineExceeded,
}

/// One sweep over the offset product for a fixed set of lifted residues.
pub struct CandidateSearcher<'a> {
    states: &'a IndexMap<String, ModulusState>,
    prime: i64,
    plain_asserts: &'a [SmtTerm],
}

impl<'a> CandidateSearcher<'a> {
    /// `states` holds the CRT-lifted residue per variable, `prime` is the
    /// latest prime in the stream (the offset unit), and `plain_asserts`
    /// are the original assertions already translated for the verification
    /// session (whose constants must be declared by the caller).
    pub fn new(
        states: &'a IndexMap<String, ModulusState>,
        prime: i64,
        plain_asserts: &'a [SmtTerm],
    ) -> Self {
        Self {
            states,
            prime,
            plain_asserts,
        }
    }

    /// Probe every offset combination until one verifies, the product is
    /// exhausted, or the deadline passes.
    pub fn search(
        &self,
        oracle: &mut dyn Oracle,
        deadline: Option<Instant>,
    ) -> Result<SearchOutcome, SolveError> {
        let mut digits = vec![0usize; self.states.len()];
        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(SearchOutcome::DeadlineExceeded);
            }
            let candidate = self.materialize(&digits)?;
            if self.probe(&candidate, oracle)? {
                debug!(?candidate, "candidate verified");
                return Ok(SearchOutcome::Found(candidate));
            }
            if !advance(&mut digits) {
                return Ok(SearchOutcome::Exhausted);
            }
        }
    }

    /// Turn one offset combination into concrete per-variable values.
    fn materialize(&self, digits: &[usize]) -> Result<Vec<(String, i64)>, SolveError> {
        let mut candidate = Vec::with_capacity(digits.len());
        for ((name, state), digit) in self.states.iter().zip(digits) {
            let value = state.residue + OFFSET_STEPS[*digit] * i128::from(self.prime);
            let value = i64::try_from(value).map_err(|_| SolveError::CandidateOverflow(value))?;
            candidate.push((name.clone(), value));
        }
        Ok(candidate)
    }

    /// Rebuild the verification session's assertion set for one candidate:
    /// the original formula plus one pin equality per variable. UNKNOWN
    /// counts as a miss.
    fn probe(
        &self,
        candidate: &[(String, i64)],
        oracle: &mut dyn Oracle,
    ) -> Result<bool, SolveError> {
        oracle.reset_assertions()?;
        for assert in self.plain_asserts {
            oracle.assert_term(assert)?;
        }
        for (name, value) in candidate {
            oracle.assert_term(&SmtTerm::var(name.clone()).eq(SmtTerm::int(*value)))?;
        }
        Ok(matches!(oracle.check_sat()?, SatOutcome::Sat))
    }
}

/// Odometer increment over base-5 digits with the last digit fastest, so
/// the first-declared variable's offset varies slowest. Returns false once
/// the product is exhausted.
fn advance(digits: &mut [usize]) -> bool {
    for digit in digits.iter_mut().rev() {
        *digit += 1;
        if *digit < OFFSET_STEPS.len() {
            return true;
        }
        *digit = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use primelift_smt::oracle::{OracleError, Value};
    use primelift_smt::sorts::Sort;

    /// Replays a fixed script of check-sat outcomes and records the pin
    /// equalities asserted before each check.
    struct Scripted {
        outcomes: Vec<SatOutcome>,
        checks: usize,
        current: Vec<SmtTerm>,
        pinned_per_check: Vec<Vec<SmtTerm>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<SatOutcome>) -> Self {
            Self {
                outcomes,
                checks: 0,
                current: Vec::new(),
                pinned_per_check: Vec::new(),
            }
        }
    }

    impl Oracle for Scripted {
        fn declare_const(&mut self, _name: &str, _sort: &Sort) -> Result<(), OracleError> {
            Ok(())
        }

        fn assert_term(&mut self, term: &SmtTerm) -> Result<(), OracleError> {
            self.current.push(term.clone());
            Ok(())
        }

        fn reset_assertions(&mut self) -> Result<(), OracleError> {
            self.current.clear();
            Ok(())
        }

        fn check_sat(&mut self) -> Result<SatOutcome, OracleError> {
            self.pinned_per_check.push(self.current.clone());
            let outcome = self
                .outcomes
                .get(self.checks)
                .cloned()
                .unwrap_or(SatOutcome::Unsat);
            self.checks += 1;
            Ok(outcome)
        }

        fn get_value(&mut self, _term: &SmtTerm) -> Result<Value, OracleError> {
            Ok(Value::Int(0))
        }
    }

    fn states(entries: &[(&str, i128, i128)]) -> IndexMap<String, ModulusState> {
        entries
            .iter()
            .map(|(name, modulus, residue)| {
                (
                    name.to_string(),
                    ModulusState {
                        modulus: *modulus,
                        residue: *residue,
                    },
                )
            })
            .collect()
    }

    fn pin(name: &str, value: i64) -> SmtTerm {
        SmtTerm::var(name).eq(SmtTerm::int(value))
    }

    #[test]
    fn first_candidate_is_the_unshifted_lift() {
        let states = states(&[("x", 6, 5)]);
        let searcher = CandidateSearcher::new(&states, 3, &[]);
        let mut oracle = Scripted::new(vec![SatOutcome::Sat]);
        let outcome = searcher.search(&mut oracle, None).unwrap();
        assert_eq!(outcome, SearchOutcome::Found(vec![("x".into(), 5)]));
        assert_eq!(oracle.checks, 1);
    }

    #[test]
    fn offsets_walk_the_latest_prime_in_fixed_order() {
        let states = states(&[("x", 6, 5)]);
        let searcher = CandidateSearcher::new(&states, 3, &[]);
        // Refute everything; collect the sequence of pinned values.
        let mut oracle = Scripted::new(vec![]);
        let outcome = searcher.search(&mut oracle, None).unwrap();
        assert_eq!(outcome, SearchOutcome::Exhausted);
        let pinned: Vec<Vec<SmtTerm>> = oracle.pinned_per_check;
        assert_eq!(
            pinned,
            vec![
                vec![pin("x", 5)],
                vec![pin("x", 2)],
                vec![pin("x", 8)],
                vec![pin("x", -1)],
                vec![pin("x", 11)],
            ]
        );
    }

    #[test]
    fn first_variable_varies_slowest() {
        let states = states(&[("a", 2, 0), ("b", 2, 1)]);
        let searcher = CandidateSearcher::new(&states, 2, &[]);
        let mut oracle = Scripted::new(vec![]);
        assert_eq!(
            searcher.search(&mut oracle, None).unwrap(),
            SearchOutcome::Exhausted
        );
        assert_eq!(oracle.checks, 25);
        // The first five probes hold `a` at its unshifted lift while `b`
        // walks its whole offset sequence.
        for probe in &oracle.pinned_per_check[..5] {
            assert_eq!(probe[0], pin("a", 0));
        }
        assert_eq!(oracle.pinned_per_check[1][1], pin("b", -1));
        // Probe 5 is the first with a shifted `a`.
        assert_eq!(oracle.pinned_per_check[5][0], pin("a", -2));
        assert_eq!(oracle.pinned_per_check[5][1], pin("b", 1));
    }

    #[test]
    fn stops_on_first_success() {
        let states = states(&[("x", 6, 5)]);
        let searcher = CandidateSearcher::new(&states, 3, &[]);
        let mut oracle = Scripted::new(vec![
            SatOutcome::Unsat,
            SatOutcome::Unknown("timeout".into()),
            SatOutcome::Sat,
        ]);
        let outcome = searcher.search(&mut oracle, None).unwrap();
        // The UNKNOWN second probe counts as a miss; the third (+p) wins.
        assert_eq!(outcome, SearchOutcome::Found(vec![("x".into(), 8)]));
        assert_eq!(oracle.checks, 3);
    }

    #[test]
    fn reasserts_the_original_formula_before_each_pin() {
        let states = states(&[("x", 6, 5)]);
        let formula = vec![SmtTerm::var("x").eq(SmtTerm::int(8))];
        let searcher = CandidateSearcher::new(&states, 3, &formula);
        let mut oracle = Scripted::new(vec![SatOutcome::Unsat, SatOutcome::Sat]);
        searcher.search(&mut oracle, None).unwrap();
        for probe in &oracle.pinned_per_check {
            assert_eq!(probe[0], formula[0]);
        }
    }

    #[test]
    fn expired_deadline_reports_before_probing() {
        let states = states(&[("x", 6, 5)]);
        let searcher = CandidateSearcher::new(&states, 3, &[]);
        let mut oracle = Scripted::new(vec![SatOutcome::Sat]);
        let past = Instant::now();
        let outcome = searcher.search(&mut oracle, Some(past)).unwrap();
        assert_eq!(outcome, SearchOutcome::DeadlineExceeded);
        assert_eq!(oracle.checks, 0);
    }

    #[test]
    fn lift_outside_the_integer_range_aborts() {
        let states = states(&[("x", i128::MAX, i128::from(i64::MAX) + 10)]);
        let searcher = CandidateSearcher::new(&states, 3, &[]);
        let mut oracle = Scripted::new(vec![]);
        assert!(matches!(
            searcher.search(&mut oracle, None),
            Err(SolveError::CandidateOverflow(_))
        ));
    }
}
