/// Lazily produces the infinite, strictly increasing sequence of primes
/// starting at 2.
///
/// Each call to [`PrimeStream::next_prime`] trial-divides candidates against
/// every prime produced so far; no sieve, since primes are consumed one at a
/// time and the stream never needs to look arbitrarily far ahead. Owned by
/// exactly one run, not restartable.
#[derive(Debug, Default)]
pub struct PrimeStream {
    found: Vec<i64>,
}

impl PrimeStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_prime(&mut self) -> i64 {
        let mut candidate = self.found.last().map_or(2, |last| last + 1);
        while self.found.iter().any(|p| candidate % p == 0) {
            candidate += 1;
        }
        self.found.push(candidate);
        candidate
    }

    /// Primes produced so far, in order.
    pub fn produced(&self) -> &[i64] {
        &self.found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_primes_in_order() {
        let mut stream = PrimeStream::new();
        let first_ten: Vec<i64> = (0..10).map(|_| stream.next_prime()).collect();
        assert_eq!(first_ten, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn sequence_is_strictly_increasing_and_coprime() {
        let mut stream = PrimeStream::new();
        let primes: Vec<i64> = (0..50).map(|_| stream.next_prime()).collect();
        for window in primes.windows(2) {
            assert!(window[0] < window[1]);
        }
        for (i, a) in primes.iter().enumerate() {
            for b in &primes[i + 1..] {
                assert_ne!(b % a, 0, "{b} divisible by {a}");
            }
        }
    }
}
