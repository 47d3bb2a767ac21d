//! Error types surfaced by the coordinator and strategies.

use thiserror::Error;

use crate::arena::ArenaError;

/// Errors returned from [`Coordinator`](crate::Coordinator) operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// An arena or its backing buffer could not satisfy a request.
    #[error("allocation failure: {0}")]
    Allocation(#[from] ArenaError),

    /// A strategy selector that names none of the four strategies.
    #[error("unknown strategy '{0}': expected one of scalar, heap, arena, vectorized")]
    InvalidStrategy(String),

    /// A trial count that would yield no meaningful estimate.
    #[error("invalid trial count {0}: must be positive")]
    InvalidTrialCount(u64),

    /// A configuration value outside its accepted range.
    #[error("invalid configuration '{name}': {reason}")]
    InvalidConfig {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A worker thread panicked before reporting its hit count.
    #[error("worker {worker} panicked")]
    WorkerPanicked {
        /// Index of the failed worker.
        worker: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
