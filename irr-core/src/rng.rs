//! Deterministic RNG streams for permutation chunks.
//!
//! A master seed is expanded into one sub-seed per chunk of iterations. Sub-seeds
//! are derived by BLAKE3 hashing, not by drawing from a shared generator, so a
//! chunk's permutations do not depend on which thread runs it or in what order.

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Stream tag mixed into every sub-seed.
const PERMUTATION_STREAM: &[u8] = b"irr-permutation-chunk";

/// Master seed plus hash-based derivation of per-chunk streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sub-seed for chunk `chunk`. Independent of derivation order.
    pub fn sub_seed(&self, chunk: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(PERMUTATION_STREAM);
        hasher.update(&chunk.to_le_bytes());
        let hash = hasher.finalize();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(seed)
    }

    /// Seeded generator for chunk `chunk`.
    pub fn rng_for(&self, chunk: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(chunk))
    }
}
