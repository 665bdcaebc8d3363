//! # The publish side.
//!
//! A [`Broker`] serializes handlers into envelopes and hands them to the
//! store: immediately runnable jobs go to the right of their queue's list,
//! scheduled jobs into the queue's time-ordered set where the consuming
//! pool's promoter picks them up once due.

use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::config::BrokerConfig;
use crate::envelope::{self, unix_millis};
use crate::error::QueueError;
use crate::job::Job;
use crate::store::{scheduled_key, RedisStore, Store};

// Producers pipeline short commands; a couple of clients is plenty.
const BROKER_CONNECTIONS: usize = 2;

/// Publishes jobs for worker pools to consume.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Broker {
    config: BrokerConfig,
    store: Arc<dyn Store>,
}

impl Broker {
    /// Validates `config` and connects to the Redis store it names.
    pub async fn connect(config: BrokerConfig) -> Result<Self, QueueError> {
        config.validate()?;
        let store =
            RedisStore::connect(&config.hostport, config.timeout, BROKER_CONNECTIONS).await?;
        Ok(Self {
            store: Arc::new(store),
            config,
        })
    }

    /// Validates `config` and publishes through the given store instead of
    /// connecting. This is how tests and alternative backends plug in.
    pub fn with_store(config: BrokerConfig, store: Arc<dyn Store>) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self { config, store })
    }

    /// Enqueues `job` on the default queue for immediate execution.
    ///
    /// Handlers are taken by value; a shared reference is not a [`Job`] and
    /// is rejected at compile time:
    ///
    /// ```compile_fail
    /// # use async_trait::async_trait;
    /// # use hauler::{Broker, Job, JobError};
    /// # use serde::{Deserialize, Serialize};
    /// # use tokio_util::sync::CancellationToken;
    /// # #[derive(Default, Serialize, Deserialize)]
    /// # struct Reindex { batch: u64 }
    /// # #[async_trait]
    /// # impl Job for Reindex {
    /// #     fn name(&self) -> &str { "reindex" }
    /// #     async fn execute(&self, _: CancellationToken) -> Result<(), JobError> { Ok(()) }
    /// # }
    /// # async fn publish(broker: Broker) -> Result<(), hauler::QueueError> {
    /// let job = Reindex { batch: 7 };
    /// broker.run(&job).await?; // `&Reindex` does not implement `Job`
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<J: Job + Serialize>(&self, job: J) -> Result<(), QueueError> {
        let queue = self.config.default_queue.clone();
        self.run_on(&queue, job).await
    }

    /// Enqueues `job` on a specific queue instead of the default.
    pub async fn run_on<J: Job + Serialize>(&self, queue: &str, job: J) -> Result<(), QueueError> {
        if queue.is_empty() {
            return Err(QueueError::bad_config("queue name must not be empty"));
        }
        let payload = envelope::encode(&job, None)?;
        self.store.push(queue, payload).await
    }

    /// Schedules `job` on the default queue, to run no earlier than `at`.
    ///
    /// Delivery latency past `at` is bounded by the consuming pool's
    /// promote interval plus its pop latency. Instants before the unix
    /// epoch are treated as already due.
    pub async fn run_at<J: Job + Serialize>(
        &self,
        job: J,
        at: SystemTime,
    ) -> Result<(), QueueError> {
        let due = unix_millis(at);
        let payload = envelope::encode(&job, Some(due))?;
        self.store
            .schedule(&scheduled_key(&self.config.default_queue), due, payload)
            .await
    }

    /// The configuration this broker was built from.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }
}
