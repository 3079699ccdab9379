use thiserror::Error;

use super::runner::RunState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid {field}: {reason}")]
    Configuration { field: &'static str, reason: String },

    #[error("total wealth is {total} at renormalization in round {round}; every agent was eliminated")]
    DegenerateState { round: u32, total: f64 },

    #[error("runner is {actual:?}, expected {expected:?}; reset it or build a new runner")]
    InvalidRunState { expected: RunState, actual: RunState },
}

impl SimError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::Configuration {
            field,
            reason: reason.into(),
        }
    }
}
