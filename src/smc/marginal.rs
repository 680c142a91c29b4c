//! Empirical marginal distribution over completed return values.
//!
//! Completed particles are histogrammed by the canonical serialization of
//! their return value; counts normalize to empirical probabilities. The
//! attached normalization constant is the log marginal-likelihood estimate
//!
//!     nc = logsumexp(final weights) − log(completed count)
//!
//! and degenerates to −∞ when nothing completed or every weight is −∞.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::numeric::logsumexp;
use crate::smc::particle::Particle;
use crate::value::Value;

/// One support point of the empirical marginal.
#[derive(Clone, Debug)]
pub struct SupportPoint {
    pub value: Value,
    pub count: usize,
    pub prob: f64,
}

/// Weighted empirical marginal with a log marginal-likelihood estimate.
#[derive(Clone, Debug)]
pub struct Marginal {
    support: Vec<SupportPoint>,
    index: HashMap<String, usize>,
    /// Log marginal-likelihood estimate; −∞ on degeneracy.
    pub normalization_constant: f64,
    num_completed: usize,
}

impl Marginal {
    /// Aggregate a completed-particle list into an empirical marginal.
    pub fn from_completed(particles: &[Particle]) -> Self {
        let mut support: Vec<SupportPoint> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for particle in particles {
            let value = match &particle.value {
                Some(value) => value,
                None => continue,
            };
            let key = value.canonical_key();
            match index.get(&key) {
                Some(&slot) => support[slot].count += 1,
                None => {
                    index.insert(key, support.len());
                    support.push(SupportPoint {
                        value: value.clone(),
                        count: 1,
                        prob: 0.0,
                    });
                }
            }
        }

        let num_completed = particles.len();
        if num_completed > 0 {
            for point in &mut support {
                point.prob = point.count as f64 / num_completed as f64;
            }
        }

        let normalization_constant = if num_completed == 0 {
            f64::NEG_INFINITY
        } else {
            let weights: Vec<f64> = particles.iter().map(|p| p.weight).collect();
            logsumexp(&weights) - (num_completed as f64).ln()
        };

        Self {
            support,
            index,
            normalization_constant,
            num_completed,
        }
    }

    pub fn support(&self) -> &[SupportPoint] {
        &self.support
    }

    pub fn num_completed(&self) -> usize {
        self.num_completed
    }

    /// Empirical probability of `value`; 0 outside the support.
    pub fn prob(&self, value: &Value) -> f64 {
        self.index
            .get(&value.canonical_key())
            .map_or(0.0, |&slot| self.support[slot].prob)
    }

    /// Log empirical probability; −∞ outside the support.
    pub fn score(&self, value: &Value) -> f64 {
        let p = self.prob(value);
        if p > 0.0 {
            p.ln()
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Draw a support value proportional to empirical mass. `None` when the
    /// support is empty.
    pub fn sample(&self, rng: &mut StdRng) -> Option<&Value> {
        if self.support.is_empty() {
            return None;
        }
        let weights = WeightedIndex::new(self.support.iter().map(|point| point.count)).ok()?;
        Some(&self.support[weights.sample(rng)].value)
    }

    /// Expectation over a numeric support; `None` if any support value is
    /// non-numeric or the support is empty.
    pub fn mean(&self) -> Option<f64> {
        if self.support.is_empty() {
            return None;
        }
        let mut acc = 0.0;
        for point in &self.support {
            acc += point.prob * point.value.as_f64()?;
        }
        Some(acc)
    }
}
