#![doc = include_str!("../README.md")]

//! Decides satisfiability of quantifier-free integer constraint files by
//! checking them modulo a growing stream of primes, lifting per-variable
//! residues with the Chinese Remainder Theorem, and verifying perturbed
//! lifted candidates against the original formula through an external
//! oracle. A modular UNSAT is a proof of integer UNSAT; a verified
//! candidate is a model.

pub mod ast;
pub mod candidate;
pub mod crt;
pub mod encode;
pub mod errors;
pub mod parse;
pub mod primes;
pub mod run;
