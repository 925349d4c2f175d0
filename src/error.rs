//! Error taxonomy for the simulation core
//!
//! Every failure is local and synchronous: a failed computation would fail
//! the same way if retried.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    /// Non-finite or out-of-domain input to a constructor or setter
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation attempted in the wrong lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A vector or physics computation left the representable range
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
    /// Configuration could not be read or parsed
    #[error("config error: {0}")]
    Config(String),
}

impl SimError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        SimError::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        SimError::InvalidState(msg.into())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;

/// Reject NaN and infinities with an `InvalidArgument` naming the field
#[inline]
pub(crate) fn ensure_finite(value: f64, what: &str) -> SimResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::invalid_argument(format!("{what} must be finite, got {value}")))
    }
}
