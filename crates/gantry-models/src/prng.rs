//! The RNG handed out through `gt_rng_construct`
//!
//! Generated quantities are the only consumers. Streams are a pure function
//! of the seed, so two RNGs seeded alike produce identical draws.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

pub struct SampleRng {
    inner: StdRng,
}

impl SampleRng {
    pub fn new(seed: u32) -> Self {
        Self {
            inner: StdRng::seed_from_u64(u64::from(seed)),
        }
    }

    /// Uniform draw on [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Bernoulli draw with success probability `p`, as 0.0 or 1.0.
    pub fn bernoulli(&mut self, p: f64) -> f64 {
        if self.inner.random_bool(p.clamp(0.0, 1.0)) {
            1.0
        } else {
            0.0
        }
    }

    /// Standard normal draw via Box-Muller.
    pub fn std_normal(&mut self) -> f64 {
        let u1: f64 = self.inner.random::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = self.inner.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SampleRng::new(99);
        let mut b = SampleRng::new(99);
        for _ in 0..32 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = SampleRng::new(1);
        let mut b = SampleRng::new(2);
        let draws_a: Vec<f64> = (0..8).map(|_| a.uniform()).collect();
        let draws_b: Vec<f64> = (0..8).map(|_| b.uniform()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn test_bernoulli_is_zero_or_one() {
        let mut rng = SampleRng::new(7);
        for _ in 0..64 {
            let d = rng.bernoulli(0.4);
            assert!(d == 0.0 || d == 1.0);
        }
    }

    #[test]
    fn test_bernoulli_extremes() {
        let mut rng = SampleRng::new(7);
        assert_eq!(rng.bernoulli(0.0), 0.0);
        assert_eq!(rng.bernoulli(1.0), 1.0);
    }

    #[test]
    fn test_std_normal_is_finite() {
        let mut rng = SampleRng::new(123);
        for _ in 0..256 {
            assert!(rng.std_normal().is_finite());
        }
    }
}
