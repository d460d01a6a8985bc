//! Error types for the simulation core.

use thiserror::Error;

/// Errors raised by graph construction, parameter validation and metrics.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A run parameter lies outside its valid range
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// A structural argument cannot be satisfied (sizes, weights, degrees)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A population without humans cannot be measured
    #[error("population has no human agents")]
    EmptyPopulation,

    /// A metric whose denominator is zero for the current state
    #[error("degenerate metric: {0}")]
    DegenerateMetric(&'static str),

    /// An agent id that does not exist in the graph
    #[error("unknown agent {0}")]
    UnknownAgent(usize),
}

impl SimError {
    pub(crate) fn parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        SimError::InvalidParameter { name, value, reason }
    }
}

/// Result alias used throughout the core.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_error_message() {
        let err = SimError::parameter("gamma", 1.5, "must be within [0, 1]");
        assert_eq!(
            err.to_string(),
            "invalid parameter `gamma` = 1.5: must be within [0, 1]"
        );
    }
}
