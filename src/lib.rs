//! Asynchronous anytime sequential Monte Carlo (aSMC) inference.
//!
//! Given a probabilistic model reified as a resumable computation that
//! requests `sample`, `factor`, and `exit` effects, the engine maintains a
//! bounded buffer of suspended particles, resamples online at every
//! observation against a running reference weight (no global barrier), and
//! aggregates completed particles into a weighted empirical marginal with a
//! log marginal-likelihood estimate. The estimator is valid for any
//! completed-particle budget, and the budget can be extended at any time.
//!
//! ```
//! use asmc::{infer, model, AsmcConfig, Bernoulli, Effect, Store};
//!
//! let coin = model(|_store| {
//!     Ok(Effect::sample("flip", Bernoulli::new(0.5), |_s, v| {
//!         Ok(Effect::exit(v))
//!     }))
//! });
//!
//! let config = AsmcConfig {
//!     num_particles: 500,
//!     buffer_size: 50,
//!     seed: 42,
//!     ..AsmcConfig::default()
//! };
//! let posterior = infer(coin, &Store::new(), config).unwrap();
//! assert_eq!(posterior.marginal().num_completed(), 500);
//! ```

pub mod error;
pub mod numeric;
pub mod primitives;
pub mod smc;
pub mod store;
pub mod value;

pub use error::{Error, Result};
pub use primitives::{Bernoulli, Exponential, Normal, Primitive, Uniform};
pub use smc::{
    model, Address, AsmcConfig, Cont, Effect, Marginal, Model, ObservationLedger, Particle,
    RunStats, Scheduler, SupportPoint,
};
pub use store::Store;
pub use value::Value;

use rayon::prelude::*;
use std::sync::Arc;

/// Inference engine for one model, store, and configuration.
pub struct Engine {
    scheduler: Scheduler,
}

impl Engine {
    /// Validates the configuration and seeds the particle buffer.
    pub fn new(model: Model, store: &Store, config: AsmcConfig) -> Result<Self> {
        Ok(Self {
            scheduler: Scheduler::new(model, store.clone(), config)?,
        })
    }

    /// Run to the completed-particle budget and aggregate.
    pub fn run(mut self) -> Result<Posterior> {
        self.scheduler.run()?;
        let marginal = Marginal::from_completed(self.scheduler.completed());
        Ok(Posterior {
            scheduler: self.scheduler,
            marginal,
        })
    }
}

/// A finished (but extendable) inference run: the aggregated marginal plus
/// the suspended engine state.
pub struct Posterior {
    scheduler: Scheduler,
    marginal: Marginal,
}

impl Posterior {
    pub fn marginal(&self) -> &Marginal {
        &self.marginal
    }

    /// The caller's store, untouched by inference; particles run on clones.
    pub fn store(&self) -> &Store {
        self.scheduler.base_store()
    }

    /// Completed particles, for diagnostics.
    pub fn particles(&self) -> &[Particle] {
        self.scheduler.completed()
    }

    pub fn ledger(&self) -> &ObservationLedger {
        self.scheduler.ledger()
    }

    pub fn stats(&self) -> RunStats {
        self.scheduler.stats()
    }

    /// Raise the completed-particle budget by `extra`, resume stepping, and
    /// re-aggregate over all completions.
    pub fn extend(mut self, extra: usize) -> Result<Posterior> {
        self.scheduler.extend(extra)?;
        let marginal = Marginal::from_completed(self.scheduler.completed());
        Ok(Posterior {
            scheduler: self.scheduler,
            marginal,
        })
    }
}

/// One-shot convenience entry: build an engine, run it, aggregate.
pub fn infer(model: Model, store: &Store, config: AsmcConfig) -> Result<Posterior> {
    Engine::new(model, store, config)?.run()
}

/// Run independent replicates in parallel; replicate `i` derives its seed as
/// `config.seed + i`, so a replicate set is as reproducible as a single run.
pub fn infer_replicates(
    model: &Model,
    store: &Store,
    config: &AsmcConfig,
    replicates: usize,
) -> Result<Vec<Posterior>> {
    (0..replicates)
        .into_par_iter()
        .map(|i| {
            let mut replicate_config = config.clone();
            replicate_config.seed = config.seed.wrapping_add(i as u64);
            infer(Arc::clone(model), store, replicate_config)
        })
        .collect()
}
