//! Trampolined coroutine protocol between model code and the scheduler.
//!
//! Model code is reified as a resumable computation: every resume returns an
//! [`Effect`] naming the operation the trajectory wants next, together with
//! the continuation to call once the engine has serviced it. The scheduler
//! drives the trampoline; model code never recurses into the engine, so
//! arbitrarily long trajectories cannot overflow the stack.
//!
//! Continuations are shared immutably (`Arc`), which is what makes forking a
//! particle cheap: the children reuse the rest-of-computation and only the
//! store is cloned.

use std::sync::Arc;

use crate::error::Result;
use crate::primitives::Primitive;
use crate::store::Store;
use crate::value::Value;

/// Opaque site label emitted by model code; never inspected by the engine.
pub type Address = String;

/// Rest-of-computation after a suspension point. Receives the particle's
/// store and the value produced at the suspension (the random draw for
/// `sample`, `Unit` for `factor`).
pub type Cont = Arc<dyn Fn(&mut Store, Value) -> Result<Effect> + Send + Sync>;

/// A model value: starts one trajectory from a fresh store clone.
pub type Model = Arc<dyn Fn(&mut Store) -> Result<Effect> + Send + Sync>;

/// Suspension request produced by a resumed trajectory.
pub enum Effect {
    /// Forward draw; serviced inline without touching the particle buffer.
    Sample {
        addr: Address,
        dist: Arc<dyn Primitive>,
        k: Cont,
    },
    /// Observation boundary: contributes `score` to the trajectory's
    /// log-weight and yields to the scheduler's resampling decision.
    Factor { addr: Address, score: f64, k: Cont },
    /// Trajectory end; `value` is the model's return value.
    Exit { value: Value },
}

impl Effect {
    pub fn sample(
        addr: impl Into<Address>,
        dist: impl Primitive + 'static,
        k: impl Fn(&mut Store, Value) -> Result<Effect> + Send + Sync + 'static,
    ) -> Self {
        Effect::Sample {
            addr: addr.into(),
            dist: Arc::new(dist),
            k: Arc::new(k),
        }
    }

    pub fn factor(
        addr: impl Into<Address>,
        score: f64,
        k: impl Fn(&mut Store, Value) -> Result<Effect> + Send + Sync + 'static,
    ) -> Self {
        Effect::Factor {
            addr: addr.into(),
            score,
            k: Arc::new(k),
        }
    }

    pub fn exit(value: impl Into<Value>) -> Self {
        Effect::Exit {
            value: value.into(),
        }
    }
}

/// Wrap a closure as a shareable model value.
pub fn model(f: impl Fn(&mut Store) -> Result<Effect> + Send + Sync + 'static) -> Model {
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::Bernoulli;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_effect_carries_continuation() {
        let effect = Effect::sample("flip", Bernoulli::new(1.0), |_s, v| Ok(Effect::exit(v)));
        let mut rng = StdRng::seed_from_u64(0);
        let mut store = Store::new();

        match effect {
            Effect::Sample { addr, dist, k } => {
                assert_eq!(addr, "flip");
                let draw = dist.sample(&mut rng);
                assert_eq!(draw, Value::Bool(true));
                match k(&mut store, draw).expect("continuation runs") {
                    Effect::Exit { value } => assert_eq!(value, Value::Bool(true)),
                    _ => panic!("expected exit"),
                }
            }
            _ => panic!("expected sample"),
        }
    }

    #[test]
    fn test_shared_continuation_sees_private_stores() {
        let k: Cont = Arc::new(|store, v| {
            store.put("draw", v.clone());
            Ok(Effect::exit(v))
        });

        let mut a = Store::new();
        let mut b = Store::new();
        let _ = Arc::clone(&k)(&mut a, Value::Int(1));
        let _ = Arc::clone(&k)(&mut b, Value::Int(2));

        assert_eq!(a.get("draw"), Some(&Value::Int(1)));
        assert_eq!(b.get("draw"), Some(&Value::Int(2)));
    }
}
