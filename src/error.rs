//! Error taxonomy for the inference engine.
//!
//! Only genuinely fatal conditions are errors: a rejected configuration, or a
//! failure raised by model code while a particle is being resumed. Numeric
//! degeneracy (every completed particle at −∞) is a value-level outcome and
//! surfaces as a marginal with a −∞ normalization constant instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any scheduler step runs.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised by model code during a resume; aborts inference, no retry.
    #[error("model failure: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, Error>;
