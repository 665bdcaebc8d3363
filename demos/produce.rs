//! # Demo: produce
//!
//! Publishes one immediate and one scheduled job through the process-wide
//! default broker. Pair it with the `consume` demo in a second terminal:
//!
//! ```bash
//! cargo run --example consume
//! cargo run --example produce
//! ```
//!
//! Both expect a Redis server on `127.0.0.1:6379`.

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use hauler::{BrokerConfig, Job, JobError};
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

    async fn execute(&self, _cancel: CancellationToken) -> Result<(), JobError> {
        for _ in 0..self.times {
            println!("hello, {}!", self.who);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. Install the default broker once.
    hauler::configure(BrokerConfig {
        hostport: "127.0.0.1:6379".into(),
        timeout: Duration::from_secs(1),
        default_queue: "greetings".into(),
    })
    .await?;

    // 2. Publish a job that is runnable right away.
    hauler::run(Greet {
        who: "world".into(),
        times: 2,
    })
    .await?;
    println!("[produce] enqueued an immediate greeting");

    // 3. And one the consumer may only run five seconds from now.
    hauler::run_at(
        Greet {
            who: "future".into(),
            times: 1,
        },
        SystemTime::now() + Duration::from_secs(5),
    )
    .await?;
    println!("[produce] scheduled a greeting for five seconds out");

    Ok(())
}
