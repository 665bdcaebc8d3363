//! # Error types used by the queue runtime and job handlers.
//!
//! This module defines two main error enums:
//!
//! - [`QueueError`] errors raised by the broker, registry, store, and worker pool.
//! - [`JobError`] errors raised by individual job executions.
//!
//! Both types provide an `as_label` helper for logs and metrics.

use thiserror::Error;

/// # Errors produced by the queue runtime.
///
/// These represent failures in the broker, registry, store, or worker pool
/// rather than in user-supplied handler logic.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// A required configuration field is missing or zero-valued.
    #[error("invalid configuration: {reason}")]
    BadConfig {
        /// Which field was rejected and why.
        reason: String,
    },

    /// A consumed envelope names a job with no registered handler.
    #[error("no handler registered for job '{name}'")]
    UnknownJob {
        /// The job name from the envelope.
        name: String,
    },

    /// Two handlers were registered under the same name.
    #[error("a handler named '{name}' is already registered")]
    DuplicateJob {
        /// The duplicate job name.
        name: String,
    },

    /// An envelope could not be parsed, or decoded into its handler type.
    #[error("malformed job envelope: {reason}")]
    Malformed {
        /// Parser or decoder diagnostic.
        reason: String,
    },

    /// A handler's arguments do not serialize to a JSON object of named
    /// fields, so it cannot cross the process boundary.
    #[error("job '{name}' does not serialize to a JSON object of named fields")]
    InvalidArguments {
        /// The offending job name.
        name: String,
    },

    /// The underlying store call failed.
    #[error("store operation failed: {0}")]
    Store(#[from] fred::error::Error),

    /// `start` was called on a pool that has already been stopped.
    #[error("worker pool has been stopped and cannot be restarted")]
    PoolStopped,

    /// The crate-level `run` was used before `configure` installed a
    /// default broker.
    #[error("no default broker configured; call configure() first")]
    NotConfigured,
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::BadConfig { .. } => "queue_bad_config",
            QueueError::UnknownJob { .. } => "queue_unknown_job",
            QueueError::DuplicateJob { .. } => "queue_duplicate_job",
            QueueError::Malformed { .. } => "queue_malformed_envelope",
            QueueError::InvalidArguments { .. } => "queue_invalid_arguments",
            QueueError::Store(_) => "queue_store_failed",
            QueueError::PoolStopped => "queue_pool_stopped",
            QueueError::NotConfigured => "queue_not_configured",
        }
    }

    pub(crate) fn bad_config(reason: impl Into<String>) -> Self {
        QueueError::BadConfig {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl ToString) -> Self {
        QueueError::Malformed {
            reason: reason.to_string(),
        }
    }
}

/// # Errors produced by job execution.
///
/// Returned by [`Job::execute`](crate::Job::execute) implementations and
/// delivered to the pool's failure handler; the worker itself keeps running.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum JobError {
    /// The handler could not complete its work.
    #[error("execution failed: {reason}")]
    Fail { reason: String },

    /// The handler observed its cancellation signal and gave up.
    ///
    /// This is **not an error** in the traditional sense, but signals
    /// intentional early termination.
    #[error("job canceled")]
    Canceled,
}

impl JobError {
    /// Shorthand for [`JobError::Fail`].
    pub fn fail(reason: impl Into<String>) -> Self {
        JobError::Fail {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Canceled => "job_canceled",
        }
    }

    /// Indicates whether the job gave up in response to cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, JobError::Canceled)
    }
}
