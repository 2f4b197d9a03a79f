// Error taxonomy — transport, application rejection, cancellation, supersession.

use thiserror::Error;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection-level failure: DNS, refused, reset, body decode.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status with no parseable error body.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The server answered with `success: false` and a message.
    #[error("{0}")]
    Rejected(String),
}

/// Failure of an engine operation (job start or result wait).
///
/// `Cancelled` and `Superseded` are expected lifecycle outcomes, not faults:
/// callers drop them silently instead of surfacing an error message.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Application-level failure; the message is shown to the user verbatim.
    #[error("{0}")]
    Analysis(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The operation was cancelled by teardown or a user cancel action.
    #[error("operation cancelled")]
    Cancelled,

    /// A newer session replaced this one while the operation was in flight.
    #[error("session superseded")]
    Superseded,
}

impl EngineError {
    /// Whether this outcome should be silently discarded rather than shown.
    pub fn is_silent(&self) -> bool {
        matches!(self, EngineError::Cancelled | EngineError::Superseded)
    }
}
