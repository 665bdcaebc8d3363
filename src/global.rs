//! # Process-wide default broker.
//!
//! Small convenience layer for producers that publish from many places:
//! [`configure`] installs a broker once, after which the crate-level
//! [`run`] and [`run_at`] publish through it without threading a handle
//! around.

use std::time::SystemTime;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::broker::Broker;
use crate::config::BrokerConfig;
use crate::error::QueueError;
use crate::job::Job;

static DEFAULT_BROKER: RwLock<Option<Broker>> = RwLock::const_new(None);

/// Validates `config`, connects, and installs the process-wide default
/// broker used by [`run`] and [`run_at`].
///
/// Calling it again replaces the previous broker; in-flight publishes keep
/// the broker they already cloned.
pub async fn configure(config: BrokerConfig) -> Result<(), QueueError> {
    let broker = Broker::connect(config).await?;
    *DEFAULT_BROKER.write().await = Some(broker);
    Ok(())
}

/// Enqueues `job` through the default broker.
///
/// Returns [`QueueError::NotConfigured`] until [`configure`] has succeeded.
pub async fn run<J: Job + Serialize>(job: J) -> Result<(), QueueError> {
    default_broker().await?.run(job).await
}

/// Schedules `job` through the default broker, to run no earlier than `at`.
pub async fn run_at<J: Job + Serialize>(job: J, at: SystemTime) -> Result<(), QueueError> {
    default_broker().await?.run_at(job, at).await
}

async fn default_broker() -> Result<Broker, QueueError> {
    DEFAULT_BROKER
        .read()
        .await
        .clone()
        .ok_or(QueueError::NotConfigured)
}
