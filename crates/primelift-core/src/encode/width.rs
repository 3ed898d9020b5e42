//! Bitwidth sizing for the bitvector encoding.
//!
//! Both policies answer the same question: how many bits must the modular
//! ring carry so that no reduced product overflows before its `bvurem`.
//! The translation reduces after every pairwise multiplication, so the
//! widest value that must be representable is a product of two residues.

use crate::errors::SolveError;

/// Alternative bitwidth policies behind one interface; exactly one is
/// active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingPolicy {
    /// Closed-form bound from the largest multiplication fan-in observed in
    /// the formula: the smallest n with (p-1)^w ≤ 2^n − 1, with w clamped
    /// to at least 2. Refuses widths at or past 32 bits rather than
    /// silently truncating.
    MulFanIn,
    /// The simpler bound n = ⌈log2(p²)⌉, enough for one pairwise product of
    /// residues before reduction.
    PrimeSquared,
}

impl SizingPolicy {
    /// Bitwidth for the given prime, using the formula's largest
    /// multiplication fan-in where the policy needs it.
    pub fn bitwidth(self, prime: i64, max_fanin: usize) -> Result<u32, SolveError> {
        match self {
            SizingPolicy::MulFanIn => fan_in_width(prime, max_fanin),
            SizingPolicy::PrimeSquared => {
                let squared = (prime as u64)
                    .checked_mul(prime as u64)
                    .ok_or(SolveError::WidthExceeded {
                        prime,
                        fanin: max_fanin,
                    })?;
                Ok(ceil_log2(squared))
            }
        }
    }
}

fn fan_in_width(prime: i64, max_fanin: usize) -> Result<u32, SolveError> {
    if prime == 2 {
        return Ok(2);
    }
    // The problem is treated as nonlinear even when no `*` appears.
    let fanin = max_fanin.max(2);

    if ceil_log2((prime - 1) as u64) as usize * fanin >= 32 {
        return Err(SolveError::WidthExceeded { prime, fanin });
    }

    let mut largest: u128 = 1;
    for _ in 0..fanin {
        largest *= (prime - 1) as u128;
    }
    for bits in 0..31u32 {
        let largest_representable = (1u128 << bits) - 1;
        if largest <= largest_representable {
            return Ok(bits);
        }
    }
    Err(SolveError::WidthExceeded { prime, fanin })
}

fn ceil_log2(x: u64) -> u32 {
    if x <= 1 {
        0
    } else {
        64 - (x - 1).leading_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prime_squared_matches_closed_form() {
        assert_eq!(SizingPolicy::PrimeSquared.bitwidth(2, 0).unwrap(), 2);
        assert_eq!(SizingPolicy::PrimeSquared.bitwidth(3, 0).unwrap(), 4);
        assert_eq!(SizingPolicy::PrimeSquared.bitwidth(5, 0).unwrap(), 5);
        assert_eq!(SizingPolicy::PrimeSquared.bitwidth(7, 0).unwrap(), 6);
    }

    #[test]
    fn fan_in_widths_never_overflow_the_product_bound() {
        // (p-1)^max(w,2) must fit in n bits for all tested combinations.
        for p in [2i64, 3, 5] {
            for w in [1usize, 2, 3] {
                let n = SizingPolicy::MulFanIn.bitwidth(p, w).unwrap();
                let effective = w.max(2);
                let mut product: u128 = 1;
                for _ in 0..effective {
                    product *= (p - 1) as u128;
                }
                assert!(
                    product <= (1u128 << n) - 1,
                    "p={p} w={w}: ({}^{effective}) > 2^{n} - 1",
                    p - 1
                );
            }
        }
    }

    #[test]
    fn fan_in_width_is_two_at_the_first_prime() {
        assert_eq!(SizingPolicy::MulFanIn.bitwidth(2, 3).unwrap(), 2);
    }

    #[test]
    fn fan_in_width_grows_with_fanin() {
        assert_eq!(SizingPolicy::MulFanIn.bitwidth(3, 2).unwrap(), 3);
        assert_eq!(SizingPolicy::MulFanIn.bitwidth(5, 2).unwrap(), 5);
        assert_eq!(SizingPolicy::MulFanIn.bitwidth(5, 3).unwrap(), 7);
    }

    #[test]
    fn oversized_combinations_are_refused() {
        // ceil(log2(65536)) * 2 = 32: at the representation limit.
        assert!(matches!(
            SizingPolicy::MulFanIn.bitwidth(65_537, 2),
            Err(SolveError::WidthExceeded { .. })
        ));
    }
}
