//! End-to-end broker → store → worker-pool tests over the in-process store.
//!
//! Each test wires its own store, broker, and pool, and each job type keeps
//! its call counts in its own statics, so the tests can run concurrently.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use hauler::{
    Broker, BrokerConfig, Failure, FailureHandler, Job, JobError, JobRegistry, MemoryStore, Store,
    WorkerConfig, WorkerPool, WorkerPoolOptions,
};

const QUEUE: &str = "hauler_test";

fn broker_config() -> BrokerConfig {
    BrokerConfig {
        hostport: "127.0.0.1:6379".into(),
        timeout: Duration::from_secs(1),
        default_queue: QUEUE.into(),
    }
}

fn worker_config() -> WorkerConfig {
    WorkerConfig {
        num_workers: 1,
        queues: vec![QUEUE.into()],
        hostport: "127.0.0.1:6379".into(),
        timeout: Duration::from_millis(50),
        promote_interval: Duration::from_millis(50),
        ..WorkerConfig::default()
    }
}

fn broker(store: Arc<MemoryStore>) -> Broker {
    Broker::with_store(broker_config(), store).expect("broker config is valid")
}

fn pool(store: Arc<MemoryStore>, jobs: JobRegistry) -> WorkerPool {
    WorkerPool::with_store(
        worker_config(),
        WorkerPoolOptions {
            jobs,
            failure: None,
        },
        store,
    )
    .expect("worker config is valid")
}

/// Polls `cond` every few milliseconds until it holds or `limit` elapses.
async fn wait_until(limit: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// Failure handler that records one tag per report.
#[derive(Default)]
struct RecordingHandler {
    events: Mutex<Vec<String>>,
}

impl RecordingHandler {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureHandler for RecordingHandler {
    async fn on_failure(&self, failure: &Failure) {
        let tag = match failure {
            Failure::Decode { error, .. } => format!("decode:{}", error.as_label()),
            Failure::Execution { job, error } => {
                format!("execution:{}:{}", job.name(), error.as_label())
            }
            Failure::Timeout { job, .. } => format!("timeout:{job}"),
            Failure::Panic { job, .. } => format!("panic:{job}"),
        };
        self.events.lock().unwrap().push(tag);
    }
}

// ---- delivery ----

static PING_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default, Serialize, Deserialize)]
struct Ping {
    foo: i64,
    bar: String,
}

#[async_trait]
impl Job for Ping {
    fn name(&self) -> &str {
        "ping"
    }

    async fn execute(&self, _cancel: CancellationToken) -> Result<(), JobError> {
        assert_eq!(self.foo, 4);
        assert_eq!(self.bar, "sup");
        PING_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn published_job_is_executed_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let mut jobs = JobRegistry::new();
    jobs.register(Ping::default()).unwrap();

    let pool = pool(store.clone(), jobs);
    pool.start().await.unwrap();

    broker(store)
        .run(Ping {
            foo: 4,
            bar: "sup".into(),
        })
        .await
        .unwrap();

    assert!(
        wait_until(Duration::from_secs(1), || {
            PING_CALLS.load(Ordering::SeqCst) == 1
        })
        .await,
        "the handler should run within a second"
    );

    // give a duplicate delivery a moment to show up, then stop
    time::sleep(Duration::from_millis(150)).await;
    pool.stop().await;
    assert_eq!(PING_CALLS.load(Ordering::SeqCst), 1);
}

// ---- job timeout ----

static SLUGGISH_CALLED: AtomicBool = AtomicBool::new(false);
static SLUGGISH_SLOW_DONE: AtomicBool = AtomicBool::new(false);

#[derive(Default, Serialize, Deserialize)]
struct Sluggish {
    foo: i64,
}

#[async_trait]
impl Job for Sluggish {
    fn name(&self) -> &str {
        "sluggish"
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<(), JobError> {
        SLUGGISH_CALLED.store(true, Ordering::SeqCst);

        tokio::select! {
            _ = time::sleep(Duration::from_secs(5)) => {
                SLUGGISH_SLOW_DONE.store(true, Ordering::SeqCst);
            }
            _ = cancel.cancelled() => {}
        }
        Ok(())
    }
}

#[tokio::test]
async fn job_timeout_fires_the_cancellation_signal() {
    let store = Arc::new(MemoryStore::new());
    let mut jobs = JobRegistry::new();
    jobs.register(Sluggish::default()).unwrap();

    let failure = Arc::new(RecordingHandler::default());
    let mut config = worker_config();
    config.job_timeout = Duration::from_millis(200);
    let pool = WorkerPool::with_store(
        config,
        WorkerPoolOptions {
            jobs,
            failure: Some(failure.clone()),
        },
        store.clone(),
    )
    .unwrap();
    pool.start().await.unwrap();

    broker(store).run(Sluggish { foo: 1 }).await.unwrap();

    assert!(
        wait_until(Duration::from_secs(2), || {
            failure.events().iter().any(|tag| tag == "timeout:sluggish")
        })
        .await,
        "the timeout should be reported once the handler returns"
    );
    pool.stop().await;

    assert!(SLUGGISH_CALLED.load(Ordering::SeqCst));
    assert!(
        !SLUGGISH_SLOW_DONE.load(Ordering::SeqCst),
        "the slow branch must lose to the cancellation signal"
    );
}

// ---- scheduled delivery ----

static DEFERRED_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default, Serialize, Deserialize)]
struct Deferred {
    foo: i64,
}

#[async_trait]
impl Job for Deferred {
    fn name(&self) -> &str {
        "deferred"
    }

    async fn execute(&self, _cancel: CancellationToken) -> Result<(), JobError> {
        DEFERRED_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn scheduled_job_is_not_delivered_early() {
    let store = Arc::new(MemoryStore::new());
    let mut jobs = JobRegistry::new();
    jobs.register(Deferred::default()).unwrap();

    let pool = pool(store.clone(), jobs);
    pool.start().await.unwrap();

    broker(store)
        .run_at(Deferred { foo: 1 }, SystemTime::now() + Duration::from_millis(800))
        .await
        .unwrap();

    time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        DEFERRED_CALLS.load(Ordering::SeqCst),
        0,
        "nothing may run before the scheduled instant"
    );

    assert!(
        wait_until(Duration::from_secs(2), || {
            DEFERRED_CALLS.load(Ordering::SeqCst) == 1
        })
        .await,
        "the job should run shortly after its instant"
    );
    pool.stop().await;
    assert_eq!(DEFERRED_CALLS.load(Ordering::SeqCst), 1);
}

// ---- promotion under contention ----

static CONTESTED_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default, Serialize, Deserialize)]
struct Contested {
    foo: i64,
}

#[async_trait]
impl Job for Contested {
    fn name(&self) -> &str {
        "contested"
    }

    async fn execute(&self, _cancel: CancellationToken) -> Result<(), JobError> {
        CONTESTED_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn concurrent_promoters_move_each_job_at_most_once() {
    let store = Arc::new(MemoryStore::new());

    // two pools, two promoters, same store and queue
    let pools: Vec<WorkerPool> = (0..2)
        .map(|_| {
            let mut jobs = JobRegistry::new();
            jobs.register(Contested::default()).unwrap();
            pool(store.clone(), jobs)
        })
        .collect();
    for pool in &pools {
        pool.start().await.unwrap();
    }

    let broker = broker(store);
    let total = 20;
    for index in 0..total {
        // all due in the past, so every tick sees the full backlog
        broker
            .run_at(Contested { foo: index }, SystemTime::now() - Duration::from_secs(1))
            .await
            .unwrap();
    }

    assert!(
        wait_until(Duration::from_secs(3), || {
            CONTESTED_CALLS.load(Ordering::SeqCst) >= total as usize
        })
        .await,
        "every scheduled job should eventually be delivered"
    );

    // any double promotion would surface as extra executions here
    time::sleep(Duration::from_millis(300)).await;
    for pool in &pools {
        pool.stop().await;
    }
    assert_eq!(CONTESTED_CALLS.load(Ordering::SeqCst), total as usize);
}

// ---- failure reporting ----

static FLAKY_CALLS: AtomicUsize = AtomicUsize::new(0);

#[derive(Default, Serialize, Deserialize)]
struct Flaky {
    foo: i64,
}

#[async_trait]
impl Job for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn execute(&self, _cancel: CancellationToken) -> Result<(), JobError> {
        let call = FLAKY_CALLS.fetch_add(1, Ordering::SeqCst);
        match call {
            0 => Err(JobError::fail("boom")),
            1 => panic!("kaboom"),
            _ => Ok(()),
        }
    }
}

#[tokio::test]
async fn worker_reports_failures_and_keeps_consuming() {
    let store = Arc::new(MemoryStore::new());
    let mut jobs = JobRegistry::new();
    jobs.register(Flaky::default()).unwrap();

    let failure = Arc::new(RecordingHandler::default());
    let pool = WorkerPool::with_store(
        worker_config(),
        WorkerPoolOptions {
            jobs,
            failure: Some(failure.clone()),
        },
        store.clone(),
    )
    .unwrap();
    pool.start().await.unwrap();

    // undecodable payloads first: broken JSON, then an unregistered name
    store.push(QUEUE, "{not json".into()).await.unwrap();
    store
        .push(QUEUE, r#"{"N":"vacuum","A":{}}"#.into())
        .await
        .unwrap();

    // then three runs of the flaky job: error, panic, success
    let broker = broker(store);
    for _ in 0..3 {
        broker.run(Flaky::default()).await.unwrap();
    }

    assert!(
        wait_until(Duration::from_secs(2), || {
            FLAKY_CALLS.load(Ordering::SeqCst) == 3
        })
        .await,
        "the worker should survive bad payloads, errors, and panics"
    );
    pool.stop().await;

    let events = failure.events();
    assert!(events.contains(&"decode:queue_malformed_envelope".to_string()));
    assert!(events.contains(&"decode:queue_unknown_job".to_string()));
    assert!(events.contains(&"execution:flaky:job_failed".to_string()));
    assert!(events.contains(&"panic:flaky".to_string()));
}

// ---- shutdown ----

static PATIENT_CANCELED: AtomicBool = AtomicBool::new(false);

#[derive(Default, Serialize, Deserialize)]
struct Patient {
    foo: i64,
}

#[async_trait]
impl Job for Patient {
    fn name(&self) -> &str {
        "patient"
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<(), JobError> {
        // cooperative: waits for work or for the pool to wind down
        tokio::select! {
            _ = time::sleep(Duration::from_secs(30)) => Ok(()),
            _ = cancel.cancelled() => {
                PATIENT_CANCELED.store(true, Ordering::SeqCst);
                Err(JobError::Canceled)
            }
        }
    }
}

#[tokio::test]
async fn stop_interrupts_cooperative_handlers_and_returns() {
    let store = Arc::new(MemoryStore::new());
    let mut jobs = JobRegistry::new();
    jobs.register(Patient::default()).unwrap();

    let pool = pool(store.clone(), jobs);
    pool.start().await.unwrap();

    broker(store).run(Patient::default()).await.unwrap();
    // let the worker pop the job and park inside the handler
    time::sleep(Duration::from_millis(200)).await;

    time::timeout(Duration::from_secs(2), pool.stop())
        .await
        .expect("stop must return once cooperative handlers yield");
    assert!(PATIENT_CANCELED.load(Ordering::SeqCst));
}
