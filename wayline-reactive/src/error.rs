use thiserror::Error;

use crate::computation::{BoxError, ComputationId};

/// Errors surfaced by the scheduler.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The body failed on its first run; the computation has been stopped.
    #[error("computation {id} failed on its first run")]
    FirstRun {
        /// Failing computation.
        id: ComputationId,
        /// Error returned by the body.
        #[source]
        source: BoxError,
    },
    /// The body failed while being re-run by a flush.
    #[error("computation {id} failed while recomputing")]
    Recompute {
        /// Failing computation.
        id: ComputationId,
        /// Error returned by the body.
        #[source]
        source: BoxError,
    },
    /// An after-flush callback failed.
    #[error("after-flush callback failed")]
    AfterFlush {
        /// Error returned by the callback.
        #[source]
        source: BoxError,
    },
    /// `flush` was called from inside a flush or a running computation.
    #[error("cannot flush from inside a flush or a running computation")]
    ReentrantFlush,
}
