//! # The capability surface the queue needs from its store.
//!
//! Higher layers never speak to a client library directly; they consume the
//! small [`Store`] trait below. [`RedisStore`] is the production
//! implementation, [`MemoryStore`] an in-process stand-in with the same
//! observable semantics for local development and tests.
//!
//! Two store shapes are in play: a plain list per queue (`RPUSH` in,
//! `BLPOP` out, FIFO per queue) and one time-ordered set per queue
//! (`<queue>:scheduled`) holding deferred envelopes scored by their due
//! instant. [`Store::promote`] is the one compound primitive: it moves a
//! member from the set to the queue and must push only when *this* call
//! removed the member, so any number of concurrent promoters move a member
//! at most once.

mod lua;
mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::error::QueueError;

/// Store operations the broker, workers, and promoter are built on.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Appends a payload to the right of `queue`.
    async fn push(&self, queue: &str, payload: String) -> Result<(), QueueError>;

    /// Pops from the left of the first non-empty of `queues`, waiting up to
    /// `timeout`. Returns the queue name and payload, or `None` on timeout
    /// (a timeout is not an error).
    async fn blocking_pop(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, QueueError>;

    /// Adds a payload to the time-ordered set `set` with the given
    /// unix-millisecond score, or rescores it if already present.
    async fn schedule(&self, set: &str, score: i64, payload: String) -> Result<(), QueueError>;

    /// Lists members of `set` due at or before `now` (unix ms), earliest
    /// first.
    async fn due(&self, set: &str, now: i64) -> Result<Vec<String>, QueueError>;

    /// Atomically removes `payload` from `set` and appends it to `queue`.
    /// Returns `false` without pushing when the member was already gone.
    async fn promote(&self, set: &str, payload: &str, queue: &str) -> Result<bool, QueueError>;

    /// Releases any connections held by the store.
    async fn close(&self) -> Result<(), QueueError> {
        Ok(())
    }
}

/// Key of the scheduled set feeding `queue`.
pub(crate) fn scheduled_key(queue: &str) -> String {
    format!("{queue}:scheduled")
}
