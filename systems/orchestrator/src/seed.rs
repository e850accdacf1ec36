//! Seed resolution and creation of the run's random source.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rollway_core::SeedMode;

/// Resolves the seed a run will use. The result is never zero.
#[must_use]
pub fn resolve_seed(mode: SeedMode) -> u64 {
    let seed = match mode {
        SeedMode::Explicit(seed) => seed,
        SeedMode::TimeBased => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default(),
        SeedMode::Random => rand::random(),
    };
    seed.max(1)
}

/// Random source exclusively owned by one run.
pub(crate) fn random_source(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use rand::RngCore;
    use rollway_core::SeedMode;

    use super::{random_source, resolve_seed};

    #[test]
    fn explicit_seeds_pass_through() {
        assert_eq!(resolve_seed(SeedMode::Explicit(42)), 42);
    }

    #[test]
    fn derived_seeds_are_never_zero() {
        assert_ne!(resolve_seed(SeedMode::TimeBased), 0);
        assert_ne!(resolve_seed(SeedMode::Random), 0);
    }

    #[test]
    fn equal_seeds_give_equal_streams() {
        let mut first = random_source(9);
        let mut second = random_source(9);
        assert_eq!(first.next_u64(), second.next_u64());
    }
}
