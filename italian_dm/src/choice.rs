// The stochastic choice policy.
//
// Every random decision of the learner goes through a `Chooser`, so the
// components that make them (numeration, alignment, spell-out, sprouting) can
// be driven either by the seeded `LearnerRng` or, in unit tests, by a
// scripted `FixedChooser` that always takes the same candidate.

use italian_dm_prng::LearnerRng;

/// Source of the learner's stochastic choices.
pub trait Chooser {
    /// Pick an index with probability proportional to `weights[i]`.
    /// Non-positive weights never win; `None` when nothing is positive.
    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize>;

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// `count` distinct indices from `[0, len)`, in ascending order.
    fn ordered_subset(&mut self, len: usize, count: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..len).collect();
        let mut picked = Vec::with_capacity(count.min(len));
        for _ in 0..count.min(len) {
            let i = self.index(pool.len());
            picked.push(pool.remove(i));
        }
        picked.sort_unstable();
        picked
    }
}

impl Chooser for LearnerRng {
    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        LearnerRng::weighted_index(self, weights)
    }

    fn index(&mut self, len: usize) -> usize {
        self.range_usize(0, len)
    }
}

/// Always picks the `k`-th usable candidate (clamped to the last one).
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedChooser {
    pub k: usize,
}

impl FixedChooser {
    pub fn new(k: usize) -> Self {
        FixedChooser { k }
    }
}

impl Chooser for FixedChooser {
    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let usable: Vec<usize> = weights
            .iter()
            .enumerate()
            .filter(|(_, w)| w.is_finite() && **w > 0.0)
            .map(|(i, _)| i)
            .collect();
        let last = usable.len().checked_sub(1)?;
        Some(usable[self.k.min(last)])
    }

    fn index(&mut self, len: usize) -> usize {
        self.k.min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_chooser_skips_zero_weights() {
        let mut first = FixedChooser::new(0);
        assert_eq!(first.weighted_index(&[0.0, 2.0, 3.0]), Some(1));
        let mut second = FixedChooser::new(1);
        assert_eq!(second.weighted_index(&[0.0, 2.0, 3.0]), Some(2));
        let mut far = FixedChooser::new(9);
        assert_eq!(far.weighted_index(&[1.0, 0.0, 1.0]), Some(2));
        assert_eq!(far.weighted_index(&[0.0, 0.0]), None);
        assert_eq!(far.index(3), 2);
    }

    #[test]
    fn test_ordered_subset_is_sorted_and_distinct() {
        let mut rng = LearnerRng::new(11);
        for _ in 0..100 {
            let subset = rng.ordered_subset(5, 3);
            assert_eq!(subset.len(), 3);
            assert!(subset.windows(2).all(|w| w[0] < w[1]));
            assert!(subset.iter().all(|&i| i < 5));
        }
        assert_eq!(FixedChooser::new(0).ordered_subset(4, 2), vec![0, 1]);
        assert_eq!(rng.ordered_subset(2, 5), vec![0, 1]);
    }

    #[test]
    fn test_rng_chooser_matches_inherent_method() {
        let mut a = LearnerRng::new(3);
        let mut b = LearnerRng::new(3);
        let weights = [1.0, 4.0, 0.5];
        for _ in 0..20 {
            assert_eq!(
                Chooser::weighted_index(&mut a, &weights),
                b.weighted_index(&weights)
            );
        }
    }
}
