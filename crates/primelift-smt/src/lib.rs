#![doc = include_str!("../README.md")]

//! Oracle seam for the primelift solver loop.
//!
//! The core algorithm never decides satisfiability itself; every check goes
//! through the [`oracle::Oracle`] trait. The default backend drives a cvc5
//! subprocess over SMT-LIB2; [`eval::ExhaustiveOracle`] decides small ground
//! formulas in-process and backs the test suites.

pub mod backends;
pub mod eval;
pub mod oracle;
pub mod sorts;
pub mod terms;
