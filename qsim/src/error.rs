use crate::SamplerRole;

/// Errors detected while validating the inputs of a simulation, before any simulation work
/// begins.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The server pool must contain at least one server.
    #[error("number of servers must be at least 1")]
    NoServers,
    /// The simulation horizon must be at least one tick long.
    #[error("horizon must be at least 1 tick")]
    ZeroHorizon,
    /// A probability table has no entries.
    #[error("probability table is empty")]
    EmptyTable,
    /// A probability table contains a negative, infinite, or NaN probability.
    #[error("invalid probability {probability} for value {value}")]
    InvalidProbability {
        /// The value the probability was attached to.
        value: i64,
        /// The rejected probability.
        probability: f64,
    },
    /// Probabilities of a table sum up to zero.
    #[error("probabilities sum to {0}, which is not positive")]
    NonPositiveSum(f64),
    /// Probabilities of a table are individually finite but their sum overflows.
    #[error("probabilities sum to {0}, which cannot be normalized")]
    NonFiniteSum(f64),
    /// A duration table can produce a value that is not a positive number of ticks.
    #[error("{role} table contains non-positive duration {value}")]
    NonPositiveDuration {
        /// Which of the two samplers is invalid.
        role: SamplerRole,
        /// The smallest value in the table.
        value: i64,
    },
}
