//! Elementary random primitives.
//!
//! The engine never inspects distribution internals: it only needs a draw
//! for `sample` effects and a log-density for scoring. Anything implementing
//! [`Primitive`] can appear in model code; the implementations here cover
//! the standard primitives the tests and demos use.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::value::Value;

/// Thin interface between model code and a sampler/scorer pair.
pub trait Primitive: Send + Sync {
    /// Draw a value forward from the distribution.
    fn sample(&self, rng: &mut StdRng) -> Value;

    /// Log-density (or log-mass) of `value`; −∞ off support.
    fn log_density(&self, value: &Value) -> f64;
}

/// Bernoulli over `Value::Bool`.
#[derive(Clone, Copy, Debug)]
pub struct Bernoulli {
    pub p: f64,
}

impl Bernoulli {
    pub fn new(p: f64) -> Self {
        Self { p }
    }
}

impl Primitive for Bernoulli {
    fn sample(&self, rng: &mut StdRng) -> Value {
        Value::Bool(rng.gen::<f64>() < self.p)
    }

    fn log_density(&self, value: &Value) -> f64 {
        match value.as_bool() {
            Some(true) => self.p.ln(),
            Some(false) => (1.0 - self.p).ln(),
            None => f64::NEG_INFINITY,
        }
    }
}

/// Gaussian over `Value::Float`.
#[derive(Clone, Copy, Debug)]
pub struct Normal {
    pub mean: f64,
    pub sd: f64,
}

impl Normal {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }
}

impl Primitive for Normal {
    fn sample(&self, rng: &mut StdRng) -> Value {
        let z: f64 = rng.sample(StandardNormal);
        Value::Float(self.mean + self.sd * z)
    }

    /// log N(x; μ, σ) = −½((x−μ)/σ)² − ln σ − ½ ln 2π
    fn log_density(&self, value: &Value) -> f64 {
        let x = match value.as_f64() {
            Some(x) => x,
            None => return f64::NEG_INFINITY,
        };
        if self.sd <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let standardized = (x - self.mean) / self.sd;
        -0.5 * standardized * standardized - self.sd.ln() - 0.5 * (2.0 * PI).ln()
    }
}

/// Uniform over the half-open interval `[lo, hi)`.
#[derive(Clone, Copy, Debug)]
pub struct Uniform {
    pub lo: f64,
    pub hi: f64,
}

impl Uniform {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }
}

impl Primitive for Uniform {
    fn sample(&self, rng: &mut StdRng) -> Value {
        if self.hi <= self.lo {
            return Value::Float(self.lo);
        }
        Value::Float(rng.gen_range(self.lo..self.hi))
    }

    fn log_density(&self, value: &Value) -> f64 {
        let width = self.hi - self.lo;
        match value.as_f64() {
            Some(x) if width > 0.0 && x >= self.lo && x < self.hi => -width.ln(),
            _ => f64::NEG_INFINITY,
        }
    }
}

/// Exponential with rate λ over `Value::Float`.
#[derive(Clone, Copy, Debug)]
pub struct Exponential {
    pub rate: f64,
}

impl Exponential {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl Primitive for Exponential {
    fn sample(&self, rng: &mut StdRng) -> Value {
        // Inverse-CDF draw; gen() is in [0, 1) so 1 - u stays positive.
        let u: f64 = rng.gen();
        Value::Float(-(1.0 - u).ln() / self.rate)
    }

    fn log_density(&self, value: &Value) -> f64 {
        match value.as_f64() {
            Some(x) if x >= 0.0 && self.rate > 0.0 => self.rate.ln() - self.rate * x,
            _ => f64::NEG_INFINITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_bernoulli_log_mass() {
        let d = Bernoulli::new(0.25);
        assert!((d.log_density(&Value::Bool(true)) - 0.25_f64.ln()).abs() < 1e-12);
        assert!((d.log_density(&Value::Bool(false)) - 0.75_f64.ln()).abs() < 1e-12);
        assert_eq!(d.log_density(&Value::Float(0.0)), f64::NEG_INFINITY);
    }

    #[test]
    fn test_standard_normal_density_at_mode() {
        let d = Normal::new(0.0, 1.0);
        let want = -0.5 * (2.0 * PI).ln();
        assert!((d.log_density(&Value::Float(0.0)) - want).abs() < 1e-12);
    }

    #[test]
    fn test_normal_scores_integers() {
        let d = Normal::new(2.0, 1.0);
        assert_eq!(
            d.log_density(&Value::Int(2)),
            d.log_density(&Value::Float(2.0))
        );
    }

    #[test]
    fn test_uniform_support() {
        let d = Uniform::new(-1.0, 3.0);
        assert!((d.log_density(&Value::Float(0.0)) + 4.0_f64.ln()).abs() < 1e-12);
        assert_eq!(d.log_density(&Value::Float(5.0)), f64::NEG_INFINITY);

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let x = d.sample(&mut rng).as_f64().expect("float draw");
            assert!((-1.0..3.0).contains(&x));
        }
    }

    #[test]
    fn test_exponential_mean_roughly_inverse_rate() {
        let d = Exponential::new(2.0);
        let mut rng = StdRng::seed_from_u64(5);
        let n = 20_000;
        let total: f64 = (0..n)
            .map(|_| d.sample(&mut rng).as_f64().expect("float draw"))
            .sum();
        assert!((total / n as f64 - 0.5).abs() < 0.02);
    }
}
