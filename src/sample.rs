//! Per-worker uniform sample source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::kernel::Lanes;

/// Uniform random pair generator owned by exactly one worker.
///
/// Every draw is a continuous uniform value in `[0, 1)`. A trial consumes
/// two draws, x first and then y.
pub struct SampleSource {
    inner: StdRng,
}

impl SampleSource {
    /// Seed from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    /// Seed deterministically. The same seed yields the same draws.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one `(x, y)` sample.
    #[inline(always)]
    pub fn next_pair(&mut self) -> (f64, f64) {
        let x = self.inner.gen::<f64>();
        let y = self.inner.gen::<f64>();
        (x, y)
    }

    /// Fill one batch, drawing x then y for each lane in turn.
    #[inline(always)]
    pub fn fill_lanes(&mut self, xs: &mut Lanes, ys: &mut Lanes) {
        for (x, y) in xs.0.iter_mut().zip(ys.0.iter_mut()) {
            *x = self.inner.gen::<f64>();
            *y = self.inner.gen::<f64>();
        }
    }
}
