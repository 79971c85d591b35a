//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ for fast, reproducible randomness. Every stochastic
//! decision in the engine (stick throws, first-player draws, AI playouts)
//! pulls from one of these, so a match replayed from the same seed and the
//! same commands ends in the same position.

use serde::{Serialize, Deserialize};

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use tab::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Ensure state is never all zeros
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Derive an independent child generator.
    ///
    /// Used to hand a worker its own stream without sharing state.
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Simple modulo - slight bias for very large max, but acceptable
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a float in [0, 1) from the top 53 bits.
    #[inline]
    pub fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Fair coin flip.
    #[inline]
    pub fn next_coin(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// Select a random element from a slice.
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let idx = self.next_int(slice.len() as u32) as usize;
            Some(&slice[idx])
        }
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Falls back to a uniform pick when every weight is zero or negative.
    /// Returns `None` only for an empty slice.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return Some(self.next_int(weights.len() as u32) as usize);
        }

        let mut r = self.next_unit() * total;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            if r < *w {
                return Some(i);
            }
            r -= *w;
        }
        // Rounding can leave r marginally positive; the last positive weight wins.
        weights.iter().rposition(|w| *w > 0.0)
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_known_values() {
        // These values must never change or persisted matches replay differently.
        let mut rng = DeterministicRng::new(42);
        assert_eq!(rng.next_u64(), 16629283624882167704);
        assert_eq!(rng.next_u64(), 1420492921613871959);
        assert_eq!(rng.next_u64(), 9768315062676884790);
    }

    #[test]
    fn test_next_int() {
        let mut rng = DeterministicRng::new(1234);

        for _ in 0..1000 {
            assert!(rng.next_int(100) < 100);
        }

        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_next_unit_range() {
        let mut rng = DeterministicRng::new(99);
        for _ in 0..1000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_coin_is_roughly_fair() {
        let mut rng = DeterministicRng::new(7);
        let heads = (0..10_000).filter(|_| rng.next_coin()).count();
        assert!((4_500..5_500).contains(&heads), "heads = {}", heads);
    }

    #[test]
    fn test_weighted_index_respects_zero_weights() {
        let mut rng = DeterministicRng::new(3);
        for _ in 0..500 {
            let idx = rng.weighted_index(&[0.0, 2.0, 0.0]).unwrap();
            assert_eq!(idx, 1);
        }
        assert_eq!(rng.weighted_index(&[]), None);
    }

    #[test]
    fn test_weighted_index_bias() {
        let mut rng = DeterministicRng::new(11);
        let mut hits = [0usize; 2];
        for _ in 0..10_000 {
            hits[rng.weighted_index(&[1.0, 3.0]).unwrap()] += 1;
        }
        // Expect ~25% / ~75%.
        assert!(hits[1] > hits[0] * 2);
    }

    #[test]
    fn test_fork_is_independent() {
        let mut parent = DeterministicRng::new(5);
        let mut child = parent.fork();
        assert_ne!(parent.next_u64(), child.next_u64());
    }

    #[test]
    fn test_serde_resumes_stream() {
        let mut rng = DeterministicRng::new(5555);
        for _ in 0..50 {
            rng.next_u64();
        }

        let saved = serde_json::to_string(&rng).unwrap();
        let next_values: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();
        let mut restored: DeterministicRng = serde_json::from_str(&saved).unwrap();

        for expected in next_values {
            assert_eq!(restored.next_u64(), expected);
        }
    }
}
