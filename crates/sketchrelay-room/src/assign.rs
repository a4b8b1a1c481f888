//! Derangement assignment: who works on which item next.
//!
//! Players and items are matched through *slots*. Slot `j` holds the item
//! last touched by `players[j]` (or nothing, for a player who touched no
//! item). A player must never land on their own slot, otherwise they
//! would be handed their own drawing or guess.
//!
//! The permutation is drawn uniformly at random and redrawn while it has
//! a fixed point. A random permutation of `n ≥ 2` elements is a
//! derangement with probability about 1/e, so after a bounded number of
//! attempts failure is negligible; if it happens anyway the slots are
//! rotated by one, which is always a derangement. This never loops
//! forever.

use rand::Rng;
use rand::seq::SliceRandom;

/// The result of [`derange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derangement {
    /// `targets[i]` is the slot given to player `i`.
    pub targets: Vec<usize>,
    /// `true` if resampling was exhausted and the rotation was used.
    pub fallback: bool,
}

impl Derangement {
    /// Returns `true` if no player received their own slot.
    pub fn has_no_fixed_points(&self) -> bool {
        self.targets
            .iter()
            .enumerate()
            .all(|(player, slot)| player != *slot)
    }
}

/// Draws a permutation of `0..n` without fixed points.
///
/// With `n < 2` no derangement exists; the identity is returned and the
/// single player keeps their own slot.
pub fn derange<R: Rng + ?Sized>(n: usize, attempts: usize, rng: &mut R) -> Derangement {
    let mut candidate = Derangement {
        targets: (0..n).collect(),
        fallback: false,
    };
    if n < 2 {
        return candidate;
    }

    for _ in 0..attempts {
        candidate.targets.shuffle(rng);
        if candidate.has_no_fixed_points() {
            return candidate;
        }
    }

    tracing::debug!(n, attempts, "resampling exhausted, rotating by one");
    Derangement {
        targets: (0..n).map(|i| (i + 1) % n).collect(),
        fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn is_permutation(targets: &[usize]) -> bool {
        let mut sorted = targets.to_vec();
        sorted.sort_unstable();
        sorted == (0..targets.len()).collect::<Vec<_>>()
    }

    #[test]
    fn test_empty_and_single_are_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(derange(0, 100, &mut rng).targets.is_empty());

        let single = derange(1, 100, &mut rng);
        assert_eq!(single.targets, vec![0]);
        assert!(!single.fallback);
    }

    #[test]
    fn test_two_players_always_swap() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(derange(2, 100, &mut rng).targets, vec![1, 0]);
        }
    }

    #[test]
    fn test_zero_attempts_rotates_by_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = derange(4, 0, &mut rng);
        assert!(result.fallback);
        assert_eq!(result.targets, vec![1, 2, 3, 0]);
        assert!(result.has_no_fixed_points());
    }

    #[test]
    fn test_default_attempts_rarely_fall_back() {
        let mut rng = StdRng::seed_from_u64(11);
        let fallbacks = (0..200)
            .filter(|_| derange(6, 100, &mut rng).fallback)
            .count();
        assert_eq!(fallbacks, 0);
    }

    proptest! {
        #[test]
        fn prop_result_is_a_derangement(n in 2usize..40, attempts in 0usize..120, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let result = derange(n, attempts, &mut rng);
            prop_assert!(is_permutation(&result.targets));
            prop_assert!(result.has_no_fixed_points());
        }
    }
}
