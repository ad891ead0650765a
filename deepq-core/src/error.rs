//! Errors of the library.
use thiserror::Error;

/// Precondition violations surfaced by the core types.
#[derive(Debug, Error)]
pub enum DeepqError {
    /// Sampling was requested from a buffer holding fewer transitions
    /// than the batch size.
    #[error("replay buffer holds {len} transitions, cannot sample a batch of {requested}")]
    NotEnoughTransitions {
        /// Number of transitions currently stored.
        len: usize,
        /// Requested batch size.
        requested: usize,
    },

    /// A record was queried with a key it does not contain.
    #[error("record key error: {0}")]
    RecordKeyError(String),

    /// A record value was queried as the wrong variant.
    #[error("record value type error: {0}")]
    RecordValueTypeError(String),
}
