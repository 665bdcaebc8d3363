//! # Broker and worker-pool configuration.
//!
//! Both config structs are plain data with a `validate` step: constructors
//! reject zero-valued required fields with [`QueueError::BadConfig`] before
//! touching the store. `Default` deliberately produces an *invalid* config
//! (empty strings, zero durations) so every deployment states its values
//! explicitly.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use hauler::{BrokerConfig, WorkerConfig};
//!
//! let broker = BrokerConfig {
//!     hostport: "127.0.0.1:6379".into(),
//!     timeout: Duration::from_secs(1),
//!     default_queue: "mail".into(),
//! };
//!
//! let workers = WorkerConfig {
//!     num_workers: 4,
//!     queues: vec!["mail".into(), "thumbnails".into()],
//!     hostport: "127.0.0.1:6379".into(),
//!     timeout: Duration::from_secs(1),
//!     job_timeout: Duration::from_secs(30),
//!     ..WorkerConfig::default()
//! };
//! # let _ = (broker, workers);
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::QueueError;
use crate::failure::FailureHandler;
use crate::registry::JobRegistry;

/// Configuration for the publish side.
#[derive(Clone, Debug, Default)]
pub struct BrokerConfig {
    /// `host:port` of the store. Required.
    pub hostport: String,
    /// Deadline for store operations. Required, positive.
    pub timeout: Duration,
    /// Queue `run` publishes to when no override is given. Required.
    pub default_queue: String,
}

impl BrokerConfig {
    pub(crate) fn validate(&self) -> Result<(), QueueError> {
        if self.hostport.is_empty() {
            return Err(QueueError::bad_config("hostport must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(QueueError::bad_config("timeout must be positive"));
        }
        if self.default_queue.is_empty() {
            return Err(QueueError::bad_config("default_queue must not be empty"));
        }
        Ok(())
    }
}

/// Configuration for the consume side.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Number of concurrent workers. Required, positive.
    pub num_workers: usize,
    /// Queues to consume, in round-robin order. Required, non-empty names.
    pub queues: Vec<String>,
    /// `host:port` of the store. Required.
    pub hostport: String,
    /// Blocking-pop wait and store operation deadline. Required, positive.
    pub timeout: Duration,
    /// Per-job cooperative timeout; zero disables it.
    pub job_timeout: Duration,
    /// How often due scheduled jobs are promoted into their queue.
    /// Must stay at or below the resolution `run_at` callers rely on.
    pub promote_interval: Duration,
}

impl Default for WorkerConfig {
    /// All required fields start zero-valued; `promote_interval`
    /// defaults to one second.
    fn default() -> Self {
        Self {
            num_workers: 0,
            queues: Vec::new(),
            hostport: String::new(),
            timeout: Duration::ZERO,
            job_timeout: Duration::ZERO,
            promote_interval: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    pub(crate) fn validate(&self) -> Result<(), QueueError> {
        if self.num_workers == 0 {
            return Err(QueueError::bad_config("num_workers must be positive"));
        }
        if self.queues.is_empty() {
            return Err(QueueError::bad_config("queues must not be empty"));
        }
        if self.queues.iter().any(String::is_empty) {
            return Err(QueueError::bad_config("queue names must not be empty"));
        }
        if self.hostport.is_empty() {
            return Err(QueueError::bad_config("hostport must not be empty"));
        }
        if self.timeout.is_zero() {
            return Err(QueueError::bad_config("timeout must be positive"));
        }
        if self.promote_interval.is_zero() {
            return Err(QueueError::bad_config("promote_interval must be positive"));
        }
        Ok(())
    }
}

/// Collaborators handed to the pool alongside its [`WorkerConfig`].
#[derive(Default)]
pub struct WorkerPoolOptions {
    /// Handlers the pool can dispatch to. Read-only once the pool starts.
    pub jobs: JobRegistry,
    /// Receives decode failures, handler errors, timeouts, and panics.
    /// When absent, failures go to the built-in log-based handler.
    pub failure: Option<Arc<dyn FailureHandler>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker_config() -> BrokerConfig {
        BrokerConfig {
            hostport: "127.0.0.1:6379".into(),
            timeout: Duration::from_secs(1),
            default_queue: "hauler_test".into(),
        }
    }

    fn worker_config() -> WorkerConfig {
        WorkerConfig {
            num_workers: 1,
            queues: vec!["hauler_test".into()],
            hostport: "127.0.0.1:6379".into(),
            timeout: Duration::from_secs(1),
            ..WorkerConfig::default()
        }
    }

    #[test]
    fn complete_configs_pass() {
        broker_config().validate().expect("broker config is complete");
        worker_config().validate().expect("worker config is complete");
    }

    #[test]
    fn zero_value_broker_fields_are_rejected() {
        BrokerConfig::default()
            .validate()
            .expect_err("empty config must fail");

        let mut config = broker_config();
        config.hostport.clear();
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = broker_config();
        config.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = broker_config();
        config.default_queue.clear();
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));
    }

    #[test]
    fn zero_value_worker_fields_are_rejected() {
        WorkerConfig::default()
            .validate()
            .expect_err("empty config must fail");

        let mut config = worker_config();
        config.num_workers = 0;
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = worker_config();
        config.queues.clear();
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = worker_config();
        config.queues.push(String::new());
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = worker_config();
        config.hostport.clear();
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = worker_config();
        config.timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));

        let mut config = worker_config();
        config.promote_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(QueueError::BadConfig { .. })));
    }

    #[test]
    fn job_timeout_zero_is_allowed() {
        let mut config = worker_config();
        config.job_timeout = Duration::ZERO;
        config.validate().expect("job_timeout is optional");
    }
}
