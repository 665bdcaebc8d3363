use std::time::Duration;

use async_trait::async_trait;
use fred::prelude::*;

use super::{lua, Store};
use crate::error::QueueError;

/// Redis-backed [`Store`] over a bounded connection pool.
///
/// Each blocking pop occupies one pooled connection for at most its
/// timeout, so the pool is sized for the number of concurrent consumers
/// plus the promoter.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Connects a pool of `connections` clients to `hostport`.
    pub async fn connect(
        hostport: &str,
        timeout: Duration,
        connections: usize,
    ) -> Result<Self, QueueError> {
        let config = Config::from_url(&format!("redis://{hostport}"))?;
        let pool = Builder::from_config(config)
            .with_connection_config(|connection| {
                connection.connection_timeout = timeout;
            })
            .build_pool(connections.max(1))?;
        pool.init().await?;

        log::debug!("connected {connections} store clients to {hostport}");
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn push(&self, queue: &str, payload: String) -> Result<(), QueueError> {
        let _: i64 = self.pool.rpush(queue, payload).await?;
        Ok(())
    }

    async fn blocking_pop(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, QueueError> {
        let popped: Option<(String, String)> = self
            .pool
            .blpop(queues.to_vec(), timeout.as_secs_f64())
            .await?;
        Ok(popped)
    }

    async fn schedule(&self, set: &str, score: i64, payload: String) -> Result<(), QueueError> {
        let _: () = self
            .pool
            .zadd(set, None, None, false, false, (score as f64, payload))
            .await?;
        Ok(())
    }

    async fn due(&self, set: &str, now: i64) -> Result<Vec<String>, QueueError> {
        let due: Vec<String> = self
            .pool
            .eval(
                lua::DUE_JOBS_SCRIPT,
                vec![set.to_string()],
                vec![now.to_string()],
            )
            .await?;
        Ok(due)
    }

    async fn promote(&self, set: &str, payload: &str, queue: &str) -> Result<bool, QueueError> {
        let moved: i64 = self
            .pool
            .eval(
                lua::PROMOTE_JOB_SCRIPT,
                vec![set.to_string(), queue.to_string()],
                vec![payload.to_string()],
            )
            .await?;
        Ok(moved == 1)
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.pool.quit().await?;
        Ok(())
    }
}
