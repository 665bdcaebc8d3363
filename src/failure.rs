//! # Failure reporting.
//!
//! Workers never bubble job problems up to the caller; everything that goes
//! wrong on the consume side is delivered to the pool's [`FailureHandler`]
//! and the worker moves on. [`LogFailureHandler`] is the built-in handler
//! used when a pool is started without one, so even envelope-level decode
//! failures stay observable.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{JobError, QueueError};
use crate::job::Job;

/// One failed consumption step.
pub enum Failure {
    /// The raw payload could not be turned into a handler (malformed
    /// document or unregistered name).
    Decode {
        /// Queue the payload was popped from.
        queue: String,
        /// The raw bytes, for dead-lettering or forensics.
        payload: String,
        /// Why decoding failed.
        error: QueueError,
    },

    /// The handler ran and returned an error.
    Execution {
        /// The decoded handler instance.
        job: Box<dyn Job>,
        /// The error it returned.
        error: JobError,
    },

    /// The job's timeout fired. The handler was signaled to cancel; if it
    /// did not cooperate it still ran to completion before this report.
    Timeout {
        /// Name of the job that overran.
        job: String,
        /// The configured per-job timeout.
        timeout: Duration,
    },

    /// The handler panicked; the worker recovered and kept running.
    Panic {
        /// Name of the job that panicked.
        job: String,
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl Failure {
    /// The name of the job involved, when one could be decoded.
    pub fn job_name(&self) -> Option<&str> {
        match self {
            Failure::Decode { .. } => None,
            Failure::Execution { job, .. } => Some(job.name()),
            Failure::Timeout { job, .. } | Failure::Panic { job, .. } => Some(job),
        }
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Decode { queue, error, .. } => f
                .debug_struct("Decode")
                .field("queue", queue)
                .field("error", error)
                .finish_non_exhaustive(),
            Failure::Execution { job, error } => f
                .debug_struct("Execution")
                .field("job", &job.name())
                .field("error", error)
                .finish(),
            Failure::Timeout { job, timeout } => f
                .debug_struct("Timeout")
                .field("job", job)
                .field("timeout", timeout)
                .finish(),
            Failure::Panic { job, message } => f
                .debug_struct("Panic")
                .field("job", job)
                .field("message", message)
                .finish(),
        }
    }
}

/// Receives every consume-side failure of a worker pool.
#[async_trait]
pub trait FailureHandler: Send + Sync + 'static {
    async fn on_failure(&self, failure: &Failure);
}

/// Default handler: reports through the `log` facade.
pub struct LogFailureHandler;

#[async_trait]
impl FailureHandler for LogFailureHandler {
    async fn on_failure(&self, failure: &Failure) {
        match failure {
            Failure::Decode {
                queue,
                payload,
                error,
            } => {
                log::warn!("discarding undecodable job from '{queue}': {error} (payload: {payload})");
            }
            Failure::Execution { job, error } => {
                log::warn!("job '{}' failed: {error}", job.name());
            }
            Failure::Timeout { job, timeout } => {
                log::warn!("job '{job}' exceeded its timeout of {timeout:?}");
            }
            Failure::Panic { job, message } => {
                log::error!("job '{job}' panicked: {message}");
            }
        }
    }
}
