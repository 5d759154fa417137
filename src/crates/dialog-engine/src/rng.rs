//! Injectable randomness for `random-branch` weighted sampling (spec §4.3,
//! §9: "Rng ... injected providers, not globals").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// A source of uniform draws in `[0, 1)`. Kept to a single method so
/// `random-branch` owns its own weighted-sampling math rather than pushing
/// distribution logic into the trait.
pub trait RngSource: Send + Sync {
    fn next_f64(&self) -> f64;
}

/// Thread-safe wrapper around [`rand::rngs::StdRng`].
pub struct SeededRng(Mutex<StdRng>);

impl SeededRng {
    pub fn from_seed(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    pub fn from_entropy() -> Self {
        Self(Mutex::new(StdRng::from_entropy()))
    }
}

impl RngSource for SeededRng {
    fn next_f64(&self) -> f64 {
        self.0.lock().expect("rng mutex poisoned").gen_range(0.0..1.0)
    }
}

/// Deterministic source that always returns the same draw. Useful for
/// pinning `random-branch` to a specific branch in tests.
pub struct FixedRng(pub f64);

impl RngSource for FixedRng {
    fn next_f64(&self) -> f64 {
        self.0
    }
}
