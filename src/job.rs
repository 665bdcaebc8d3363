//! # Job abstraction.
//!
//! This module defines the [`Job`] trait: an async, cancelable unit of work
//! that can cross process boundaries. A job carries a stable name used for
//! dispatch and receives a [`CancellationToken`] that fires when its timeout
//! elapses or the worker pool shuts down.
//!
//! Jobs travel through the store as serialized field documents, so any type
//! that should be enqueued also derives `Serialize`/`Deserialize`; the fields
//! those impls expose are exactly what the consumer sees.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::JobError;

/// # Asynchronous, cancelable unit of background work.
///
/// A `Job` has a stable [`name`](Job::name) and an async
/// [`execute`](Job::execute) method that receives a [`CancellationToken`].
/// The token fires when the job's timeout elapses or the pool is stopping;
/// cooperative handlers check it and return promptly. A handler that ignores
/// it runs to completion and blocks its worker for that long.
///
/// Jobs are always passed and registered **by value**; references do not
/// implement this trait, so a shared handler can never be enqueued or used
/// as a registry prototype.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use hauler::{Job, JobError};
/// use serde::{Deserialize, Serialize};
/// use tokio_util::sync::CancellationToken;
///
/// #[derive(Default, Serialize, Deserialize)]
/// struct SendReceipt {
///     order_id: u64,
///     address: String,
/// }
///
/// #[async_trait]
/// impl Job for SendReceipt {
///     fn name(&self) -> &str {
///         "send_receipt"
///     }
///
///     async fn execute(&self, cancel: CancellationToken) -> Result<(), JobError> {
///         if cancel.is_cancelled() {
///             return Err(JobError::Canceled);
///         }
///         // deliver the receipt...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Job: Send + Sync + 'static {
    /// Returns the stable name this job is registered and dispatched under.
    fn name(&self) -> &str;

    /// Executes the job until completion or cancellation.
    ///
    /// Implementations should watch `cancel` (poll [`CancellationToken::is_cancelled`]
    /// or await [`CancellationToken::cancelled`]) and exit quickly once it fires.
    async fn execute(&self, cancel: CancellationToken) -> Result<(), JobError>;
}
