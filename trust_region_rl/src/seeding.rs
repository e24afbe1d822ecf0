//! Deterministic seeding of the tensor backend.
//!
//! Host-side generators (environment, policy init, minibatch shuffling) are
//! not touched here; callers hand the same integer to each of them.

use burn::tensor::backend::Backend;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Largest framework seed drawn from the numeric generator (exclusive).
pub const MAX_FRAMEWORK_SEED: u64 = (1 << 31) - 1;

/// Seeds for one training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSeeds {
    /// Run seed the framework seed is derived from
    pub numeric: u64,
    /// Seed handed to the tensor backend
    pub framework: u64,
}

/// Derive the framework seed from the numeric seed.
///
/// The framework seed is the first draw in `[1, 2^31 - 1)` of a `StdRng`
/// seeded with `numeric`. The generator is dropped afterwards.
pub fn derive_seeds(numeric: u64) -> RunSeeds {
    let mut rng = StdRng::seed_from_u64(numeric);
    RunSeeds {
        numeric,
        framework: rng.gen_range(1..MAX_FRAMEWORK_SEED),
    }
}

/// Seed backend `B` and return the derived seeds.
pub fn seed_everything<B: Backend>(numeric: u64) -> RunSeeds {
    let seeds = derive_seeds(numeric);
    B::seed(seeds.framework);
    log::debug!(
        "run seed {}, tensor backend seeded with {}",
        seeds.numeric,
        seeds.framework
    );
    seeds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_seed_is_deterministic() {
        assert_eq!(derive_seeds(1), derive_seeds(1));
    }

    #[test]
    fn test_framework_seed_is_first_draw_of_run_seed() {
        let mut rng = StdRng::seed_from_u64(7);
        let first: u64 = rng.gen_range(1..MAX_FRAMEWORK_SEED);
        let seeds = derive_seeds(7);
        assert_eq!(seeds.numeric, 7);
        assert_eq!(seeds.framework, first);
    }

    #[test]
    fn test_derived_seed_in_range() {
        for numeric in 0..64 {
            let seeds = derive_seeds(numeric);
            assert!(seeds.framework >= 1 && seeds.framework < MAX_FRAMEWORK_SEED);
        }
    }
}
