// Deterministic, portable pseudo-random number generator for the learner.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Hand-rolled with zero external dependencies so that a learner run is
// reproducible bit-for-bit on every platform.
//
// Every stochastic decision of a run (nominalizer choice, semantic terminal
// hypotheses, overt/null alignment, Vocabulary Item insertion, sprouting)
// draws from one `LearnerRng`, consumed in a fixed order. Two runs over the
// same corpus with the same seed produce the same grammar.
//
// On top of the uniform primitives this crate provides `weighted_index()`,
// the roulette-wheel selection that the learner uses as its generation
// mechanism. It is the only place floating point touches the stream, and it
// only consumes one `next_f64()` per call.
//
// **Critical constraint: determinism.** Every method must produce identical
// output given the same prior state. No stdlib RNG, no OS entropy, no
// iteration over unordered collections.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG, the learner's sole source of randomness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerRng {
    s: [u64; 4],
}

impl LearnerRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `LearnerRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Non-positive and non-finite weights never win. Returns `None` when no
    /// weight is positive; in that case no randomness is consumed, so an
    /// empty choice does not shift the rest of the stream.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| w.is_finite() && w > 0.0;
        let total: f64 = weights.iter().copied().filter(|&w| usable(w)).sum();
        if total <= 0.0 {
            return None;
        }
        let r = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_usable = None;
        for (i, &w) in weights.iter().enumerate() {
            if !usable(w) {
                continue;
            }
            cumulative += w;
            last_usable = Some(i);
            if r < cumulative {
                return Some(i);
            }
        }
        // Rounding can leave r a hair above the final cumulative sum.
        last_usable
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = LearnerRng::new(42);
        let mut b = LearnerRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = LearnerRng::new(42);
        let mut b = LearnerRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = LearnerRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = LearnerRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = LearnerRng::new(42);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = LearnerRng::new(7);
        for _ in 0..1000 {
            let i = rng.weighted_index(&[0.0, 3.0, 0.0, 1.0]).unwrap();
            assert!(i == 1 || i == 3, "picked a zero-weight slot: {i}");
        }
    }

    #[test]
    fn weighted_index_none_without_positive_weight() {
        let mut rng = LearnerRng::new(7);
        let before = rng.clone();
        assert_eq!(rng.weighted_index(&[]), None);
        assert_eq!(rng.weighted_index(&[0.0, -1.0, f64::NAN]), None);
        // No draw was consumed.
        assert_eq!(rng.next_u64(), before.clone().next_u64());
    }

    #[test]
    fn weighted_index_distribution() {
        let mut rng = LearnerRng::new(2024);
        let n = 20_000;
        let mut hits = [0usize; 2];
        for _ in 0..n {
            hits[rng.weighted_index(&[3.0, 1.0]).unwrap()] += 1;
        }
        let share = hits[0] as f64 / n as f64;
        assert!(
            (0.72..0.78).contains(&share),
            "expected ~75% for weight 3 vs 1, got {:.1}%",
            share * 100.0
        );
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = LearnerRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: LearnerRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
