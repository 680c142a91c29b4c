//! Particle-buffer scheduler and coroutine handlers.
//!
//! The scheduler owns a bounded buffer of suspended particles. Each step
//! picks uniformly among the buffered slots plus one fresh-injection slot,
//! resumes the chosen trajectory on the trampoline, and services its next
//! effect: `sample` inline, `factor` through the observation ledger's
//! resampling decision, `exit` onto the completed list. The loop runs until
//! the completed-particle budget is met; the budget can be extended at any
//! time, which is what makes the estimator anytime.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::smc::coroutine::{Cont, Effect, Model};
use crate::smc::ledger::ObservationLedger;
use crate::smc::particle::Particle;
use crate::store::Store;
use crate::value::Value;

/// Configuration for one engine run.
#[derive(Clone, Debug)]
pub struct AsmcConfig {
    /// Target number of completed particles.
    pub num_particles: usize,
    /// Maximum buffer occupancy (ρ). Seeding uses ⌊3ρ/5⌋ fresh particles.
    pub buffer_size: usize,
    /// Seed threaded through scheduling, sampling, and resampling draws.
    pub seed: u64,
    /// Scheduler steps without a completion before the run gives up and
    /// aggregates whatever has completed. Guards against models that kill
    /// every trajectory.
    pub stall_limit: u64,
}

impl Default for AsmcConfig {
    fn default() -> Self {
        Self {
            num_particles: 1000,
            buffer_size: 100,
            seed: 0,
            stall_limit: 1_000_000,
        }
    }
}

impl AsmcConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.num_particles < 1 {
            return Err(Error::InvalidConfig(format!(
                "num_particles must be >= 1, got {}",
                self.num_particles
            )));
        }
        if self.buffer_size < 1 {
            return Err(Error::InvalidConfig(format!(
                "buffer_size must be >= 1, got {}",
                self.buffer_size
            )));
        }
        Ok(())
    }

    /// Initial seeding count: ⌊3ρ/5⌋.
    fn initial_particles(&self) -> usize {
        self.buffer_size * 3 / 5
    }
}

/// Counters describing a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub steps: u64,
    pub fresh_injections: u64,
    pub forks: u64,
    /// Resumptions out of a saturated buffer that absorbed pending fork
    /// credits into multiplicity.
    pub saturation_folds: u64,
    pub drops: u64,
    /// True when the stall guard aborted stepping before the budget was met.
    pub stalled: bool,
}

pub struct Scheduler {
    config: AsmcConfig,
    model: Model,
    base_store: Store,
    buffer: Vec<Particle>,
    completed: Vec<Particle>,
    ledger: ObservationLedger,
    rng: StdRng,
    target: usize,
    steps_since_completion: u64,
    stats: RunStats,
}

impl Scheduler {
    pub fn new(model: Model, base_store: Store, config: AsmcConfig) -> Result<Self> {
        config.validate()?;
        let rng = StdRng::seed_from_u64(config.seed);
        let target = config.num_particles;
        let mut scheduler = Self {
            config,
            model,
            base_store,
            buffer: Vec::new(),
            completed: Vec::new(),
            ledger: ObservationLedger::new(),
            rng,
            target,
            steps_since_completion: 0,
            stats: RunStats::default(),
        };
        let seeds = scheduler.config.initial_particles();
        for _ in 0..seeds {
            let particle = scheduler.fresh_particle();
            scheduler.buffer.push(particle);
        }
        debug!(seeds, buffer_size = scheduler.config.buffer_size, "seeded particle buffer");
        Ok(scheduler)
    }

    /// Step until the completed-particle budget is met or the stall guard
    /// trips.
    pub fn run(&mut self) -> Result<()> {
        while self.completed.len() < self.target {
            if self.steps_since_completion >= self.config.stall_limit {
                self.stats.stalled = true;
                warn!(
                    steps_since_completion = self.steps_since_completion,
                    completed = self.completed.len(),
                    target = self.target,
                    "no completions within stall limit; aborting run"
                );
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Raise the completed-particle budget by `extra` and resume stepping.
    pub fn extend(&mut self, extra: usize) -> Result<()> {
        self.target += extra;
        self.steps_since_completion = 0;
        self.stats.stalled = false;
        self.run()
    }

    /// One scheduling step: select the next unit of work and resume it to
    /// its next suspension.
    fn step(&mut self) -> Result<()> {
        self.stats.steps += 1;
        self.steps_since_completion += 1;

        // Inclusive upper bound: the extra slot is fresh injection, so every
        // buffered particle is picked with probability 1/(|buffer|+1). A
        // saturated buffer withholds the fresh slot: a brand-new trajectory
        // could not be re-admitted after its first observation without
        // exceeding the occupancy bound.
        let saturated = self.buffer.len() >= self.config.buffer_size;
        let slots = if saturated {
            self.buffer.len()
        } else {
            self.buffer.len() + 1
        };
        let slot = self.rng.gen_range(0..slots);

        let active = if slot == self.buffer.len() {
            self.stats.fresh_injections += 1;
            self.fresh_particle()
        } else if self.buffer[slot].children_to_spawn > 1 {
            if saturated {
                // No slot would be free for a forked child to re-enter, so
                // the pending children are absorbed into multiplicity and
                // the record resumes whole: one slot keeps standing in for
                // all of them.
                self.stats.saturation_folds += 1;
                let mut particle = self.buffer.remove(slot);
                particle.multiplicity *= particle.children_to_spawn as u64;
                particle.children_to_spawn = 1;
                particle
            } else {
                // Spend one fork credit; the source keeps its buffer slot.
                self.stats.forks += 1;
                let child = self.buffer[slot].clone_one();
                self.buffer[slot].children_to_spawn -= 1;
                child
            }
        } else {
            self.buffer.remove(slot)
        };

        self.resume(active)
    }

    fn fresh_particle(&self) -> Particle {
        let model = Arc::clone(&self.model);
        let start: Cont = Arc::new(move |store: &mut Store, _resume: Value| model(store));
        Particle::init(&self.base_store, start)
    }

    /// Drive the active particle's trampoline until it suspends at an
    /// observation or exits.
    fn resume(&mut self, mut active: Particle) -> Result<()> {
        let start = Arc::clone(&active.continuation);
        let mut effect = start(&mut active.store, Value::Unit)?;
        loop {
            match effect {
                Effect::Sample { addr, dist, k } => {
                    // Forward-only: draw and continue without suspending.
                    let draw = dist.sample(&mut self.rng);
                    trace!(addr = %addr, draw = ?draw, "sample");
                    effect = k(&mut active.store, draw)?;
                }
                Effect::Factor { addr, score, k } => {
                    trace!(addr = %addr, score, "factor");
                    self.on_factor(active, score, k);
                    return Ok(());
                }
                Effect::Exit { value } => {
                    self.on_exit(active, value);
                    return Ok(());
                }
            }
        }
    }

    /// Observation boundary: rebase the particle against the ledger's
    /// reference weight and re-buffer, fork, or drop it.
    fn on_factor(&mut self, mut particle: Particle, score: f64, k: Cont) {
        particle.weight += score;
        particle.continuation = k;
        let index = particle.factor_index.map_or(0, |i| i + 1);
        particle.factor_index = Some(index);

        if particle.is_dead() {
            self.stats.drops += 1;
            trace!(index, "dropped dead particle at observation");
            return;
        }

        let offspring = self.ledger.resample(
            index,
            particle.weight,
            particle.multiplicity,
            self.config.buffer_size,
            &mut self.rng,
        );
        if offspring.children == 0 {
            self.stats.drops += 1;
            trace!(index, "pruned at observation");
            return;
        }

        // Every selection path leaves a slot free for the survivor: resuming
        // out of a saturated buffer always vacates one, and fresh injections
        // and forks only happen below saturation. Re-entry therefore never
        // pushes occupancy past the buffer size.
        particle.children_to_spawn = offspring.children;
        particle.weight = offspring.log_weight;
        particle.final_weight =
            (particle.multiplicity as f64).ln() + particle.weight + score;
        self.buffer.push(particle);
    }

    /// Trajectory end: finalize the weight and record the completion.
    fn on_exit(&mut self, mut particle: Particle, value: Value) {
        particle.value = Some(value);
        particle.completed = true;
        particle.weight = particle.final_weight;
        self.completed.push(particle);
        self.steps_since_completion = 0;
        trace!(completed = self.completed.len(), target = self.target, "particle completed");
    }

    pub fn completed(&self) -> &[Particle] {
        &self.completed
    }

    pub fn ledger(&self) -> &ObservationLedger {
        &self.ledger
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn base_store(&self) -> &Store {
        &self.base_store
    }

    pub fn config(&self) -> &AsmcConfig {
        &self.config
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn target(&self) -> usize {
        self.target
    }
}
