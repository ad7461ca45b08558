//! Endpoint selection. Uniform random pick from the healthy set.
//!
//! Spreading queries randomly across healthy endpoints is also what
//! gives failover: a node that drops out of the healthy set simply stops
//! being picked. The random source is owned by the selector so tests can
//! seed it.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub struct EndpointSelector<R = StdRng> {
    rng: R,
}

impl EndpointSelector<StdRng> {
    /// Selector seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic selector; the same seed yields the same picks.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for EndpointSelector<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> EndpointSelector<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Pick one endpoint, or `None` when nothing is healthy.
    pub fn select<'a>(&mut self, healthy: &'a [String]) -> Option<&'a String> {
        healthy.choose(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn endpoints() -> Vec<String> {
        vec![
            "https://a.wax.test".into(),
            "https://b.wax.test".into(),
            "https://c.wax.test".into(),
        ]
    }

    #[test]
    fn test_empty_set_selects_nothing() {
        let mut selector = EndpointSelector::seeded(1);
        assert!(selector.select(&[]).is_none());
    }

    #[test]
    fn test_single_endpoint_always_chosen() {
        let mut selector = EndpointSelector::seeded(1);
        let only = vec!["https://a.wax.test".to_string()];
        for _ in 0..10 {
            assert_eq!(selector.select(&only), Some(&only[0]));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let eps = endpoints();
        let mut a = EndpointSelector::seeded(42);
        let mut b = EndpointSelector::seeded(42);
        let picks_a: Vec<_> = (0..20).map(|_| a.select(&eps).cloned()).collect();
        let picks_b: Vec<_> = (0..20).map(|_| b.select(&eps).cloned()).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_selection_covers_healthy_set() {
        let eps = endpoints();
        let mut selector = EndpointSelector::seeded(7);
        let seen: HashSet<_> = (0..200).filter_map(|_| selector.select(&eps).cloned()).collect();
        assert_eq!(seen.len(), eps.len(), "every endpoint should get picked eventually");
    }
}
