//! Deterministic random number generation.
//!
//! Every stochastic component of the bagged filter draws from a
//! [`SimpleRng`]. Per-parameter tasks get their own stream derived from a
//! per-step base seed, so a sweep gives identical results whether the
//! tasks run sequentially or on a thread pool.

use rand::{RngCore, SeedableRng};

/// Golden-ratio increment used to spread task seeds apart.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Simple deterministic random number generator using Xorshift64.
///
/// Small, fast and reproducible. Good enough for perturbation noise and
/// resampling draws; plugs into `rand` through [`RngCore`].
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new SimpleRng with the given seed.
    /// If seed is 0, uses 1 instead to avoid degenerate state.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    /// Independent stream for task `index` of a step seeded with `base_seed`.
    pub fn for_task(base_seed: u64, index: usize) -> Self {
        Self::new(base_seed.wrapping_add((index as u64 + 1).wrapping_mul(SEED_STRIDE)))
    }

    #[inline]
    fn next_state(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl RngCore for SimpleRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_state() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_state()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut chunks = dest.chunks_exact_mut(8);
        for chunk in &mut chunks {
            chunk.copy_from_slice(&self.next_state().to_le_bytes());
        }
        let rest = chunks.into_remainder();
        if !rest.is_empty() {
            let bytes = self.next_state().to_le_bytes();
            let len = rest.len();
            rest.copy_from_slice(&bytes[..len]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for SimpleRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
