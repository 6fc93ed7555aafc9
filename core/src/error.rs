//! Error types shared by every layer of the harness.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type BenchResult<T> = Result<T, BenchError>;

/// Everything that can end a benchmark run early or reject its inputs.
///
/// Errors are cloneable so a single failure can be handed out from the
/// distributor's shared slot and stored inside a [`crate::BenchmarkResult`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BenchError {
    /// Prepare, execute or scan failure reported by the connection.
    #[error("database error: {0}")]
    Database(String),

    /// A query that must return a row returned none.
    #[error("query returned no rows")]
    NoRows,

    /// A scanned column did not have the expected type.
    #[error("unexpected column type: expected {expected}, got {actual}")]
    ColumnType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Malformed input handed to a job setup step or a benchmark.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A per-operation metric was requested for a run with no operations.
    #[error("cannot derive per-operation metric: zero operations")]
    ZeroOperations,

    /// A rate was requested for a run that took no measurable time.
    #[error("cannot derive rate: zero elapsed time")]
    ZeroDuration,

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// A task changed state out of order (e.g. ended before it started).
    #[error("task {id}: cannot move from {from} to {to}")]
    TaskState {
        id: String,
        from: &'static str,
        to: &'static str,
    },

    /// The domain operation of a job task failed.
    #[error("task {id} failed: {source}")]
    Task {
        id: String,
        #[source]
        source: Box<BenchError>,
    },

    /// Several tasks failed while the job continued past failures.
    #[error("{failed} of {total} tasks failed, first: {first}")]
    TasksFailed {
        failed: usize,
        total: usize,
        first: Box<BenchError>,
    },
}

impl BenchError {
    /// Wrap any displayable driver error as a [`BenchError::Database`].
    pub fn database(err: impl std::fmt::Display) -> Self {
        BenchError::Database(err.to_string())
    }
}
