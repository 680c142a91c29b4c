//! Particle record: the in-memory state of one suspended trajectory.

use std::fmt;
use std::sync::Arc;

use crate::smc::coroutine::Cont;
use crate::store::Store;
use crate::value::Value;

/// A suspended trajectory through the model.
///
/// `weight` is the log-weight accumulated since the last rebasing at an
/// observation; `final_weight` is the log-weight that will be reported if
/// the trajectory completes. `multiplicity` counts how many logical copies
/// this record stands in for when the buffer is saturated, and
/// `children_to_spawn` is the remaining fork credit for its buffer slot.
pub struct Particle {
    pub continuation: Cont,
    pub store: Store,
    pub weight: f64,
    pub final_weight: f64,
    pub multiplicity: u64,
    pub children_to_spawn: u32,
    /// Zero-based index of the last observation passed; `None` before the
    /// first. Monotone non-decreasing along a trajectory.
    pub factor_index: Option<usize>,
    pub value: Option<Value>,
    pub completed: bool,
}

impl Particle {
    /// Fresh particle: weights 0, multiplicity 1, one slot credit, cloned
    /// store, no observation passed yet.
    pub fn init(store: &Store, continuation: Cont) -> Self {
        Self {
            continuation,
            store: store.clone(),
            weight: 0.0,
            final_weight: 0.0,
            multiplicity: 1,
            children_to_spawn: 1,
            factor_index: None,
            value: None,
            completed: false,
        }
    }

    /// Fork primitive: one child mirroring this record with a freshly cloned
    /// store and a single slot credit. The caller decrements the source's
    /// `children_to_spawn`.
    pub fn clone_one(&self) -> Self {
        Self {
            continuation: Arc::clone(&self.continuation),
            store: self.store.clone(),
            weight: self.weight,
            final_weight: self.final_weight,
            multiplicity: self.multiplicity,
            children_to_spawn: 1,
            factor_index: self.factor_index,
            value: self.value.clone(),
            completed: self.completed,
        }
    }

    /// A particle at −∞ is dead and must not be re-enqueued.
    #[inline]
    pub fn is_dead(&self) -> bool {
        self.weight == f64::NEG_INFINITY
    }
}

impl fmt::Debug for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("weight", &self.weight)
            .field("final_weight", &self.final_weight)
            .field("multiplicity", &self.multiplicity)
            .field("children_to_spawn", &self.children_to_spawn)
            .field("factor_index", &self.factor_index)
            .field("value", &self.value)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}
