//! Anytime sequential Monte Carlo core.
//!
//! This module provides:
//! - Effect / Cont / Model: the trampolined coroutine protocol for model code
//! - Particle: the state of one suspended trajectory
//! - ObservationLedger: per-observation reference weights and child accounting
//! - Scheduler: the bounded-buffer control loop and coroutine handlers
//! - Marginal: the aggregated empirical distribution and likelihood estimate

pub mod coroutine;
pub mod ledger;
pub mod marginal;
pub mod particle;
pub mod scheduler;

pub use coroutine::{model, Address, Cont, Effect, Model};
pub use ledger::{Arrival, ObservationLedger, Offspring};
pub use marginal::{Marginal, SupportPoint};
pub use particle::Particle;
pub use scheduler::{AsmcConfig, RunStats, Scheduler};
