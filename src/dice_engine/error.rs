//! Error types for the DRV engine.

use thiserror::Error;

/// Every failure the engine can report. All of them are raised by the call
/// that introduced the bad input; nothing is retried or silently dropped.
#[derive(Debug, Error)]
pub enum DrvError {
    /// A probability outside `[0, 1]` was given to a constructor.
    #[error("probability not in range: {0}")]
    ProbabilityOutOfRange(String),

    /// A parameter with an invalid value (zero-sided die, zero repeat count, ...).
    #[error("invalid argument: {0}")]
    Domain(String),

    /// Unsupported operand combination or a value of the wrong kind.
    #[error("type error: {0}")]
    Type(String),

    /// The divisor could take the value zero.
    #[error("division by zero: {0}")]
    DivisionByZero(String),

    /// `given` was asked to condition on an event that cannot happen.
    #[error("cannot condition on an event with zero probability")]
    ZeroProbabilityCondition,

    /// Integer arithmetic on possible values overflowed `i64`.
    #[error("integer overflow: {0}")]
    Overflow(String),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DrvError>;
