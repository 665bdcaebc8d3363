//! # Demo: consume
//!
//! Runs a two-worker pool on the `greetings` queue until Ctrl-C, then
//! drains gracefully. Feed it with the `produce` demo.
//!
//! ```bash
//! cargo run --example consume
//! ```
//!
//! Expects a Redis server on `127.0.0.1:6379`.

use std::time::Duration;

use async_trait::async_trait;
use hauler::{Job, JobError, JobRegistry, WorkerConfig, WorkerPool, WorkerPoolOptions};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Default, Serialize, Deserialize)]
struct Greet {
    who: String,
    times: u32,
}

#[async_trait]
impl Job for Greet {
    fn name(&self) -> &str {
        "greet"
    }

    async fn execute(&self, cancel: CancellationToken) -> Result<(), JobError> {
        for _ in 0..self.times {
            if cancel.is_cancelled() {
                return Err(JobError::Canceled);
            }
            println!("hello, {}!", self.who);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. Tell the pool which handlers it can dispatch to.
    let mut jobs = JobRegistry::new();
    jobs.register(Greet::default())?;

    // 2. Two workers, one queue, jobs canceled after ten seconds.
    let pool = WorkerPool::new(
        WorkerConfig {
            num_workers: 2,
            queues: vec!["greetings".into()],
            hostport: "127.0.0.1:6379".into(),
            timeout: Duration::from_secs(1),
            job_timeout: Duration::from_secs(10),
            ..WorkerConfig::default()
        },
        WorkerPoolOptions {
            jobs,
            failure: None,
        },
    )?;
    pool.start().await?;
    println!("[consume] pool running; Ctrl-C to drain and exit");

    // 3. Drain on Ctrl-C.
    tokio::signal::ctrl_c().await?;
    pool.stop().await;
    println!("[consume] all workers exited");
    Ok(())
}
