//! Incremental Chinese Remainder combination.
//!
//! Follows the constructive two-modulus form: with Bezout coefficients
//! a1*m1 + a2*m2 = 1 for coprime m1, m2, the unique solution of
//! x ≡ r1 (mod m1), x ≡ r2 (mod m2) in [0, m1*m2) is
//! (r1*a2*m2 + r2*a1*m1) mod m1*m2.

use crate::errors::SolveError;

/// Per-variable knowledge "true value ≡ residue (mod modulus)".
///
/// The modulus only ever grows multiplicatively across rounds of the same
/// file, and the residue is always normalized into [0, modulus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulusState {
    pub modulus: i128,
    pub residue: i128,
}

/// Fold a new (prime, residue) observation into the running state.
///
/// With no prior state (first successful round) the state is the
/// observation itself. Pure and deterministic; all arithmetic is checked so
/// a modulus outgrowing i128 aborts the file instead of wrapping.
pub fn combine(
    prior: Option<ModulusState>,
    prime: i64,
    residue: i128,
) -> Result<ModulusState, SolveError> {
    let prime = prime as i128;
    let Some(prior) = prior else {
        return Ok(ModulusState {
            modulus: prime,
            residue: residue.rem_euclid(prime),
        });
    };

    let (a1, a2) = bezout(prior.modulus, prime);
    let modulus = prior
        .modulus
        .checked_mul(prime)
        .ok_or(SolveError::ModulusOverflow)?;

    // (r1*a2*m2 + r2*a1*m1) mod m1*m2, checked term by term.
    let term1 = prior
        .residue
        .checked_mul(a2)
        .and_then(|t| t.checked_mul(prime))
        .ok_or(SolveError::ModulusOverflow)?;
    let term2 = residue
        .checked_mul(a1)
        .and_then(|t| t.checked_mul(prior.modulus))
        .ok_or(SolveError::ModulusOverflow)?;
    let mut combined = term1
        .checked_add(term2)
        .ok_or(SolveError::ModulusOverflow)?
        % modulus;
    if combined < 0 {
        combined += modulus;
    }

    Ok(ModulusState {
        modulus,
        residue: combined,
    })
}

/// Bezout coefficients (a1, a2) with a1*m1 + a2*m2 = gcd(m1, m2), by the
/// recursive Extended Euclidean Algorithm. The moduli used here are
/// pairwise distinct primes, so the gcd is always 1.
pub fn bezout(m1: i128, m2: i128) -> (i128, i128) {
    if m2 == 0 {
        // gcd(m1, 0) = m1 = 1*m1 + 0*0
        (1, 0)
    } else {
        let (x, y) = bezout(m2, m1 % m2);
        (y, x - (m1 / m2) * y)
    }
}
