//! Artificial latency sampling for matched rules.

use crate::config::ResponseDelay;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Draws response delays from a shared random source.
///
/// One instance is shared by every concurrent request handler; the
/// generator sits behind a mutex so simultaneous draws cannot corrupt its
/// state. Tests construct a [`seeded`](DelaySampler::seeded) instance for
/// reproducible draws.
pub struct DelaySampler {
    rng: Mutex<StdRng>,
}

impl DelaySampler {
    /// Create a sampler seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Create a deterministic sampler from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Sample a delay duration from the configured range.
    ///
    /// `min == max` yields exactly that value without touching the
    /// generator; otherwise an integer is drawn uniformly from the
    /// inclusive range `[min, max]`.
    pub fn sample(&self, delay: &ResponseDelay) -> Duration {
        let ms = if delay.max > delay.min {
            // Poisoned mutex means a thread panicked mid-draw; generator
            // state is unrecoverable.
            let mut rng = self.rng.lock().expect("delay rng mutex poisoned");
            rng.gen_range(delay.min..=delay.max)
        } else {
            delay.min
        };
        Duration::from_millis(ms)
    }
}

impl Default for DelaySampler {
    fn default() -> Self {
        Self::from_entropy()
    }
}
