//! # The consume side: a supervised set of workers plus one promoter.
//!
//! [`WorkerPool`] owns everything the consume side needs: the store
//! connections, `num_workers` worker loops, and the scheduled-job promoter.
//! Its lifecycle is a small monotone state machine,
//! `Created → Running → Stopping → Stopped`, guarded by a single mutex that
//! is never held across a store call or handler invocation.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::config::{WorkerConfig, WorkerPoolOptions};
use crate::error::QueueError;
use crate::failure::{FailureHandler, LogFailureHandler};
use crate::promoter::Promoter;
use crate::registry::JobRegistry;
use crate::store::{RedisStore, Store};
use crate::worker::Worker;

/// Lifecycle of a [`WorkerPool`]. Transitions are monotone: a stopped pool
/// never runs again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Owns workers, promoter, and store connections for one consumer process.
///
/// Cheap to clone; clones control the same pool.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: WorkerConfig,
    registry: Arc<JobRegistry>,
    failure: Arc<dyn FailureHandler>,
    store_override: Option<Arc<dyn Store>>,
    state: Mutex<PoolState>,
    shutdown: CancellationToken,
    tasks: tokio::sync::Mutex<Option<PoolTasks>>,
}

struct PoolTasks {
    set: JoinSet<()>,
    store: Arc<dyn Store>,
}

impl WorkerPool {
    /// Validates `config` and builds a pool that connects to Redis on
    /// [`start`](WorkerPool::start).
    pub fn new(config: WorkerConfig, options: WorkerPoolOptions) -> Result<Self, QueueError> {
        Self::build(config, options, None)
    }

    /// Like [`new`](WorkerPool::new), but consumes from the given store
    /// instead of connecting. This is how tests and alternative backends
    /// plug in.
    pub fn with_store(
        config: WorkerConfig,
        options: WorkerPoolOptions,
        store: Arc<dyn Store>,
    ) -> Result<Self, QueueError> {
        Self::build(config, options, Some(store))
    }

    fn build(
        config: WorkerConfig,
        options: WorkerPoolOptions,
        store: Option<Arc<dyn Store>>,
    ) -> Result<Self, QueueError> {
        config.validate()?;
        let failure = options
            .failure
            .unwrap_or_else(|| Arc::new(LogFailureHandler));

        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                registry: Arc::new(options.jobs),
                failure,
                store_override: store,
                state: Mutex::new(PoolState::Created),
                shutdown: CancellationToken::new(),
                tasks: tokio::sync::Mutex::new(None),
            }),
        })
    }

    /// Where the pool is in its lifecycle.
    pub fn state(&self) -> PoolState {
        *self.inner.lock_state()
    }

    /// Spins up the workers and the promoter.
    ///
    /// A no-op when already running. Returns [`QueueError::PoolStopped`]
    /// once the pool has been stopped; a pool whose connection attempt
    /// fails also moves to `Stopped` and stays there.
    pub async fn start(&self) -> Result<(), QueueError> {
        // Serializes start/stop against each other.
        let mut tasks = self.inner.tasks.lock().await;

        match *self.inner.lock_state() {
            PoolState::Created => {}
            PoolState::Running => return Ok(()),
            PoolState::Stopping | PoolState::Stopped => return Err(QueueError::PoolStopped),
        }

        let config = &self.inner.config;
        let store = match &self.inner.store_override {
            Some(store) => store.clone(),
            None => {
                // one connection per worker, one for the promoter
                let connections = config.num_workers + 1;
                match RedisStore::connect(&config.hostport, config.timeout, connections).await {
                    Ok(store) => Arc::new(store) as Arc<dyn Store>,
                    Err(error) => {
                        *self.inner.lock_state() = PoolState::Stopped;
                        return Err(error);
                    }
                }
            }
        };

        let mut set = JoinSet::new();
        for id in 0..config.num_workers {
            set.spawn(
                Worker {
                    id,
                    store: store.clone(),
                    registry: self.inner.registry.clone(),
                    failure: self.inner.failure.clone(),
                    queues: config.queues.clone(),
                    pop_timeout: config.timeout,
                    job_timeout: config.job_timeout,
                    backoff: BackoffPolicy::default(),
                    shutdown: self.inner.shutdown.clone(),
                }
                .run(),
            );
        }
        set.spawn(
            Promoter {
                store: store.clone(),
                queues: config.queues.clone(),
                interval: config.promote_interval,
                shutdown: self.inner.shutdown.clone(),
            }
            .run(),
        );

        *tasks = Some(PoolTasks { set, store });
        *self.inner.lock_state() = PoolState::Running;

        log::info!(
            "worker pool started: {} worker(s) on {:?}",
            config.num_workers,
            config.queues
        );
        Ok(())
    }

    /// Signals every worker and the promoter to exit, then blocks until
    /// they have. Each worker first finishes its in-flight job, so the wait
    /// is bounded only by handler cooperation. Idempotent.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.lock_state();
            match *state {
                PoolState::Running => *state = PoolState::Stopping,
                PoolState::Created => {
                    *state = PoolState::Stopped;
                    return;
                }
                // another caller is draining, or the pool is already down;
                // fall through and wait on the tasks lock with them
                PoolState::Stopping | PoolState::Stopped => {}
            }
        }

        self.inner.shutdown.cancel();

        // Holding the tasks lock through the drain makes concurrent stop
        // callers block until the last worker has exited too.
        let mut tasks = self.inner.tasks.lock().await;
        if let Some(mut drained) = tasks.take() {
            while drained.set.join_next().await.is_some() {}
            if let Err(error) = drained.store.close().await {
                log::warn!("failed to close store connections: {error}");
            }
            log::info!("worker pool stopped");
        }

        *self.inner.lock_state() = PoolState::Stopped;
    }
}

impl PoolInner {
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
