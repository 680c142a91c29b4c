//! Observation ledger and online resampling policy.
//!
//! Each observation index keeps the ordered sequence of particle arrivals
//! seen so far. The running reference weight `wbar` after the k-th arrival
//! follows the recurrence
//!
//!     wbar_k = logsumexp( log((k−1)/d) + wbar_{k−1}, log(m/d) + W )
//!
//! with `d = (k−1) + m`, `W` the arriving log-weight and `m` the arriving
//! multiplicity. Comparing `W` to `wbar` decides whether the arrival is
//! pruned, kept, or multiplied, which approximates synchronous resampling
//! without any global barrier.

use rand::rngs::StdRng;
use rand::Rng;

use crate::numeric::log_add;

/// One arrival at an observation: the reference weight after the arrival
/// and the integer number of children awarded to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrival {
    pub wbar: f64,
    pub children: u32,
}

/// Resampling outcome for an arriving particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Offspring {
    /// Number of children awarded; 0 means the particle is dropped.
    pub children: u32,
    /// Log-weight each child carries forward; −∞ when dropped.
    pub log_weight: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ObservationLedger {
    observations: Vec<Vec<Arrival>>,
}

impl ObservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct observation indices seen so far.
    pub fn observations(&self) -> usize {
        self.observations.len()
    }

    /// Number of particles that have arrived at observation `index`.
    pub fn arrivals(&self, index: usize) -> usize {
        self.observations.get(index).map_or(0, Vec::len)
    }

    /// Arrival records at observation `index`, in insertion order.
    pub fn entries(&self, index: usize) -> &[Arrival] {
        self.observations.get(index).map_or(&[], Vec::as_slice)
    }

    /// Apply the resampling policy for a particle arriving at observation
    /// `index` with log-weight `weight` and the given multiplicity, append
    /// the arrival record, and return the offspring decision.
    ///
    /// The caller guarantees `weight > −∞`; dead particles never reach the
    /// ledger.
    pub fn resample(
        &mut self,
        index: usize,
        weight: f64,
        multiplicity: u64,
        buffer_size: usize,
        rng: &mut StdRng,
    ) -> Offspring {
        if self.observations.len() <= index {
            self.observations.resize_with(index + 1, Vec::new);
        }

        // First arrival seeds the reference weight and passes through
        // with a single child, weight unchanged.
        if self.observations[index].is_empty() {
            self.observations[index].push(Arrival {
                wbar: weight,
                children: 1,
            });
            return Offspring {
                children: 1,
                log_weight: weight,
            };
        }

        let k = self.observations[index].len() + 1;
        let m = multiplicity as f64;
        let prev_wbar = self.observations[index][k - 2].wbar;
        let denom = (k - 1) as f64 + m;
        let wbar = log_add(
            (((k - 1) as f64) / denom).ln() + prev_wbar,
            (m / denom).ln() + weight,
        );
        let log_ratio = weight - wbar;

        let offspring = if log_ratio < 0.0 {
            // Underperformer: keep one child with probability exp(log_ratio),
            // rebased to the reference weight; otherwise prune.
            if rng.gen::<f64>().ln() < log_ratio {
                Offspring {
                    children: 1,
                    log_weight: wbar,
                }
            } else {
                Offspring {
                    children: 0,
                    log_weight: f64::NEG_INFINITY,
                }
            }
        } else {
            // Outperformer: integer child count near exp(log_ratio), rounding
            // up only while the observation is still under-populated.
            let total: u64 = self.observations[index]
                .iter()
                .map(|a| a.children as u64)
                .sum();
            let min_k = buffer_size.min(k - 1) as u64;
            let ratio = log_ratio.exp();
            let children = if total <= min_k {
                ratio.ceil()
            } else {
                ratio.floor()
            } as u32;
            Offspring {
                children,
                log_weight: weight - (children as f64).ln(),
            }
        };

        // The reference weight advances on every arrival, including pruned
        // ones; `children` records the outcome.
        self.observations[index].push(Arrival {
            wbar,
            children: offspring.children,
        });
        offspring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_first_arrival_seeds_reference() {
        let mut ledger = ObservationLedger::new();
        let out = ledger.resample(0, -1.5, 1, 10, &mut rng());

        assert_eq!(out, Offspring { children: 1, log_weight: -1.5 });
        assert_eq!(ledger.arrivals(0), 1);
        assert_eq!(ledger.entries(0)[0], Arrival { wbar: -1.5, children: 1 });
    }

    #[test]
    fn test_second_arrival_recurrence() {
        let mut ledger = ObservationLedger::new();
        let mut rng = rng();
        ledger.resample(0, 0.0, 1, 10, &mut rng);
        let w = 3.5_f64.ln();
        ledger.resample(0, w, 1, 10, &mut rng);

        // k = 2, m = 1: wbar = log( (exp(0) + exp(w)) / 2 )
        let want = log_add(0.5_f64.ln(), 0.5_f64.ln() + w);
        let got = ledger.entries(0)[1].wbar;
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn test_outperformer_child_count_and_weight() {
        let mut ledger = ObservationLedger::new();
        let mut rng = rng();
        ledger.resample(0, 0.0, 1, 10, &mut rng);

        // W = ln 3.5 beats wbar = ln 2.25; ratio ≈ 1.56, under-populated
        // observation rounds up to 2 children at weight W − ln 2.
        let w = 3.5_f64.ln();
        let out = ledger.resample(0, w, 1, 10, &mut rng);
        assert_eq!(out.children, 2);
        assert!((out.log_weight - (w - 2.0_f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn test_rounding_flips_once_populated() {
        // Pre-populate so total children exceeds min(bufferSize, k−1),
        // then the same ratio rounds down.
        let mut ledger = ObservationLedger::new();
        let mut rng = rng();
        ledger.resample(0, 0.0, 1, 10, &mut rng);
        for _ in 0..6 {
            ledger.resample(0, 1.0, 1, 10, &mut rng);
        }
        let k = ledger.arrivals(0) + 1;
        let total: u64 = ledger.entries(0).iter().map(|a| a.children as u64).sum();
        assert!(total > 10.min(k as u64 - 1));

        let prev_wbar = ledger.entries(0)[k - 2].wbar;
        let w = prev_wbar + 0.4; // ratio in (1, 2) ⇒ floor gives 1
        let out = ledger.resample(0, w, 1, 10, &mut rng);
        assert_eq!(out.children, 1);
        assert!((out.log_weight - w).abs() < 1e-12);
    }

    #[test]
    fn test_hopeless_underperformer_is_pruned() {
        let mut ledger = ObservationLedger::new();
        let mut rng = rng();
        ledger.resample(0, 100.0, 1, 10, &mut rng);

        // log-ratio around −100: ln(u) essentially never beats it.
        let out = ledger.resample(0, 0.0, 1, 10, &mut rng);
        assert_eq!(out.children, 0);
        assert_eq!(out.log_weight, f64::NEG_INFINITY);
        // The pruned arrival still advanced the reference weight.
        assert_eq!(ledger.arrivals(0), 2);
        assert_eq!(ledger.entries(0)[1].children, 0);
        assert!(ledger.entries(0)[1].wbar.is_finite());
    }

    #[test]
    fn test_marginal_underperformer_is_kept_at_reference() {
        let mut ledger = ObservationLedger::new();
        let mut rng = rng();
        ledger.resample(0, 0.0, 1, 10, &mut rng);

        // log-ratio barely below zero: ln(u) < −1e−12 almost surely.
        let w = -1e-12;
        let out = ledger.resample(0, w, 1, 10, &mut rng);
        assert_eq!(out.children, 1);
        let wbar = ledger.entries(0)[1].wbar;
        assert_eq!(out.log_weight, wbar);
    }

    #[test]
    fn test_observations_tracked_independently() {
        let mut ledger = ObservationLedger::new();
        let mut rng = rng();
        ledger.resample(0, 0.0, 1, 10, &mut rng);
        ledger.resample(0, 0.0, 1, 10, &mut rng);
        ledger.resample(1, -2.0, 1, 10, &mut rng);

        assert_eq!(ledger.observations(), 2);
        assert_eq!(ledger.arrivals(0), 2);
        assert_eq!(ledger.arrivals(1), 1);
        assert_eq!(ledger.entries(1)[0], Arrival { wbar: -2.0, children: 1 });
    }

    #[test]
    fn test_multiplicity_shifts_reference() {
        // A multiplicity-m arrival weighs m/(k−1+m) in the recurrence.
        let mut a = ObservationLedger::new();
        let mut b = ObservationLedger::new();
        let mut rng_a = rng();
        let mut rng_b = rng();
        a.resample(0, 0.0, 1, 10, &mut rng_a);
        b.resample(0, 0.0, 1, 10, &mut rng_b);
        a.resample(0, 1.0, 1, 10, &mut rng_a);
        b.resample(0, 1.0, 4, 10, &mut rng_b);

        let wbar_single = a.entries(0)[1].wbar;
        let wbar_multi = b.entries(0)[1].wbar;
        assert!(wbar_multi > wbar_single);

        let want = log_add(0.2_f64.ln(), 0.8_f64.ln() + 1.0);
        assert!((wbar_multi - want).abs() < 1e-12);
    }
}
