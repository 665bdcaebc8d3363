//! # hauler
//!
//! **Hauler** is a Redis-backed background-job crate.
//!
//! A [`Broker`] serializes jobs into self-describing envelopes and enqueues
//! them, immediately or at a scheduled instant; a [`WorkerPool`] in any
//! process sharing the store decodes and executes them. Producers and
//! consumers only need to agree on job names and fields.
//!
//! ## Features
//!
//! | Area           | Description                                                        | Key types / traits                      |
//! |----------------|--------------------------------------------------------------------|-----------------------------------------|
//! | **Jobs**       | Define jobs as serializable types with an async, cancelable body.  | [`Job`], [`JobError`]                   |
//! | **Publishing** | Enqueue now, on a chosen queue, or at a future instant.            | [`Broker`], [`configure`], [`run`]      |
//! | **Consuming**  | A supervised pool of workers with per-job timeouts.                | [`WorkerPool`], [`WorkerConfig`]        |
//! | **Dispatch**   | Map envelope names back to handler types.                          | [`JobRegistry`]                         |
//! | **Failures**   | Observe decode errors, handler errors, timeouts, and panics.       | [`FailureHandler`], [`Failure`]         |
//! | **Stores**     | Redis in production, in-process for development and tests.         | [`Store`], [`RedisStore`], [`MemoryStore`] |
//!
//! Delivery is **at-least-once**: a worker that dies mid-job loses that
//! job, and nothing is redelivered automatically. Scheduled jobs are
//! guaranteed only to run no *earlier* than their instant.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use async_trait::async_trait;
//! use hauler::{
//!     Broker, BrokerConfig, Job, JobError, JobRegistry, WorkerConfig, WorkerPool,
//!     WorkerPoolOptions,
//! };
//! use serde::{Deserialize, Serialize};
//! use tokio_util::sync::CancellationToken;
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct SendWelcomeMail {
//!     user_id: u64,
//! }
//!
//! #[async_trait]
//! impl Job for SendWelcomeMail {
//!     fn name(&self) -> &str {
//!         "send_welcome_mail"
//!     }
//!
//!     async fn execute(&self, cancel: CancellationToken) -> Result<(), JobError> {
//!         if cancel.is_cancelled() {
//!             return Err(JobError::Canceled);
//!         }
//!         // talk to the mail provider...
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut jobs = JobRegistry::new();
//!     jobs.register(SendWelcomeMail::default())?;
//!
//!     let pool = WorkerPool::new(
//!         WorkerConfig {
//!             num_workers: 4,
//!             queues: vec!["mail".into()],
//!             hostport: "127.0.0.1:6379".into(),
//!             timeout: Duration::from_secs(1),
//!             job_timeout: Duration::from_secs(30),
//!             ..WorkerConfig::default()
//!         },
//!         WorkerPoolOptions { jobs, ..WorkerPoolOptions::default() },
//!     )?;
//!     pool.start().await?;
//!
//!     let broker = Broker::connect(BrokerConfig {
//!         hostport: "127.0.0.1:6379".into(),
//!         timeout: Duration::from_secs(1),
//!         default_queue: "mail".into(),
//!     })
//!     .await?;
//!     broker.run(SendWelcomeMail { user_id: 42 }).await?;
//!
//!     pool.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! ---

mod backoff;
mod broker;
mod config;
mod envelope;
mod error;
mod failure;
mod global;
mod job;
mod pool;
mod promoter;
mod registry;
mod store;
mod worker;

// ---- Public re-exports ----

pub use broker::Broker;
pub use config::{BrokerConfig, WorkerConfig, WorkerPoolOptions};
pub use envelope::Envelope;
pub use error::{JobError, QueueError};
pub use failure::{Failure, FailureHandler, LogFailureHandler};
pub use global::{configure, run, run_at};
pub use job::Job;
pub use pool::{PoolState, WorkerPool};
pub use registry::JobRegistry;
pub use store::{MemoryStore, RedisStore, Store};
