//! Distributions over the continuous parameters of terminals.

use super::GrammarError;
use rand::{distributions::Distribution, Rng, RngCore};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use std::f64::NEG_INFINITY;
use std::fmt;

/// A distribution from which a terminal parameter is drawn when the terminal
/// is created, and under which its log-density is scored afterwards.
pub trait Prior: fmt::Debug + Send + Sync {
    fn sample(&self, rng: &mut dyn RngCore) -> f64;
    fn log_density(&self, x: f64) -> f64;
}

/// An unbounded Gaussian.
#[derive(Debug, Clone)]
pub struct NormalPrior {
    normal: Normal,
}

impl NormalPrior {
    pub fn new(mean: f64, std_dev: f64) -> Result<Self, GrammarError> {
        let normal = Normal::new(mean, std_dev).map_err(|e| {
            GrammarError::InvalidPrior(format!("normal({}, {}): {}", mean, std_dev, e))
        })?;
        Ok(NormalPrior { normal })
    }
}

impl Prior for NormalPrior {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        self.normal.sample(rng)
    }
    fn log_density(&self, x: f64) -> f64 {
        self.normal.ln_pdf(x)
    }
}

/// A Gaussian restricted to the open interval `(lower, upper)`.
///
/// Sampling uses the inverse CDF of the untruncated Gaussian on a uniform
/// draw over `(cdf(lower), cdf(upper))`; the density is renormalized by the
/// mass of the interval and is zero outside of it.
#[derive(Debug, Clone)]
pub struct TruncatedNormalPrior {
    normal: Normal,
    lower: f64,
    upper: f64,
    cdf_lower: f64,
    log_mass: f64,
}

impl TruncatedNormalPrior {
    pub fn new(mean: f64, std_dev: f64, lower: f64, upper: f64) -> Result<Self, GrammarError> {
        let describe = || format!("truncated normal({}, {}, {}, {})", mean, std_dev, lower, upper);
        if !(lower < upper) {
            return Err(GrammarError::InvalidPrior(format!("{}: empty support", describe())));
        }
        let normal = Normal::new(mean, std_dev)
            .map_err(|e| GrammarError::InvalidPrior(format!("{}: {}", describe(), e)))?;
        let cdf_lower = normal.cdf(lower);
        let mass = normal.cdf(upper) - cdf_lower;
        if !(mass > 0.0) {
            return Err(GrammarError::InvalidPrior(format!(
                "{}: support has no mass",
                describe()
            )));
        }
        Ok(TruncatedNormalPrior {
            normal,
            lower,
            upper,
            cdf_lower,
            log_mass: mass.ln(),
        })
    }
    pub fn bounds(&self) -> (f64, f64) {
        (self.lower, self.upper)
    }
}

impl Prior for TruncatedNormalPrior {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        let mass = self.log_mass.exp();
        let u = self.cdf_lower + rng.gen::<f64>() * mass;
        let x = self.normal.inverse_cdf(u);
        // Round-off at the tails can land exactly on a bound.
        x.max(self.lower).min(self.upper)
    }
    fn log_density(&self, x: f64) -> f64 {
        if x > self.lower && x < self.upper {
            self.normal.ln_pdf(x) - self.log_mass
        } else {
            NEG_INFINITY
        }
    }
}

/// A uniform distribution over `[lower, upper)`.
#[derive(Debug, Clone)]
pub struct UniformPrior {
    lower: f64,
    upper: f64,
}

impl UniformPrior {
    pub fn new(lower: f64, upper: f64) -> Result<Self, GrammarError> {
        if !(lower < upper) || !lower.is_finite() || !upper.is_finite() {
            return Err(GrammarError::InvalidPrior(format!(
                "uniform({}, {}): empty or unbounded support",
                lower, upper
            )));
        }
        Ok(UniformPrior { lower, upper })
    }
}

impl Prior for UniformPrior {
    fn sample(&self, rng: &mut dyn RngCore) -> f64 {
        rng.gen_range(self.lower..self.upper)
    }
    fn log_density(&self, x: f64) -> f64 {
        if x >= self.lower && x < self.upper {
            -(self.upper - self.lower).ln()
        } else {
            NEG_INFINITY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn normal_prior_log_density_test() {
        let prior = NormalPrior::new(0.0, 1.0).unwrap();
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((prior.log_density(0.0) - expected).abs() < 1e-12);
        assert!(NormalPrior::new(0.0, -1.0).is_err());
    }

    #[test]
    fn truncated_normal_prior_stays_in_support_test() {
        let prior = TruncatedNormalPrior::new(0.5, 0.15, 0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let x = prior.sample(&mut rng);
            assert!(x >= 0.0 && x <= 1.0, "{} out of support", x);
        }
        assert_eq!(NEG_INFINITY, prior.log_density(-0.1));
        assert_eq!(NEG_INFINITY, prior.log_density(1.5));
        // Truncation only raises the density inside the support.
        let untruncated = NormalPrior::new(0.5, 0.15).unwrap();
        assert!(prior.log_density(0.5) > untruncated.log_density(0.5));
    }

    #[test]
    fn truncated_normal_prior_rejects_empty_support_test() {
        assert!(TruncatedNormalPrior::new(0.0, 1.0, 1.0, 1.0).is_err());
        assert!(TruncatedNormalPrior::new(0.0, 1.0, 100.0, 101.0).is_err());
    }

    #[test]
    fn uniform_prior_test() {
        let prior = UniformPrior::new(-1.0, 3.0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let x = prior.sample(&mut rng);
            assert!((prior.log_density(x) + 4f64.ln()).abs() < 1e-12);
        }
        assert_eq!(NEG_INFINITY, prior.log_density(3.0));
    }
}
