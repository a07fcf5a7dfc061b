//! Pipeline error types

use thiserror::Error;

/// Errors raised while handing work between pipeline contexts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The receiving context has shut down
    #[error("{0} context has stopped")]
    ContextStopped(&'static str),

    /// A context task panicked or was aborted
    #[error("{context} context failed: {message}")]
    TaskFailed {
        /// Context name
        context: &'static str,
        /// Join error description
        message: String,
    },
}
