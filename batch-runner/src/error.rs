//! Error taxonomy: a task-level failure and the batch-level failure that
//! wraps the first one encountered while joining.

/// Failure of a single unit of work's call against the delayed endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The request never produced a response
    #[error("delay request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status
    #[error("delay endpoint answered status {0}")]
    Status(u16),

    /// The response body could not be read
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The response body was not valid UTF-8
    #[error("response body was not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Batch-level failure returned by the runner. The whole batch aborts on the
/// first failed task found in submission order; resolved results are
/// discarded rather than returned partially.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// A unit of work failed; `index` is the task's submission index
    #[error("task {index} failed")]
    Task {
        /// Submission index of the failed task
        index: usize,
        /// The underlying task failure
        #[source]
        source: TaskError,
    },

    /// The execution context running a task went away before answering,
    /// which means the task panicked or its worker died
    #[error("execution context for task {index} was lost before it produced a result")]
    ContextLost {
        /// Submission index of the orphaned task
        index: usize,
    },
}
