use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::envelope::unix_millis;
use crate::error::QueueError;
use crate::store::{scheduled_key, Store};

/// Background loop that moves due scheduled jobs into their queue.
///
/// Promotion is atomic per member, so any number of pools watching the same
/// queues promote each member at most once; losing a race is normal and
/// skipped silently. A promoter that dies between scanning and promoting
/// leaves the member in the set for the next tick.
pub(crate) struct Promoter {
    pub store: Arc<dyn Store>,
    pub queues: Vec<String>,
    pub interval: Duration,
    pub shutdown: CancellationToken,
}

impl Promoter {
    pub async fn run(self) {
        log::debug!("promoter started ({:?} interval)", self.interval);

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for queue in &self.queues {
                if let Err(error) = self.promote_due(queue).await {
                    log::warn!("promoter: scheduled scan for '{queue}' failed: {error}");
                }
            }
        }

        log::debug!("promoter stopped");
    }

    async fn promote_due(&self, queue: &str) -> Result<(), QueueError> {
        let set = scheduled_key(queue);
        let now = unix_millis(SystemTime::now());

        for payload in self.store.due(&set, now).await? {
            if self.store.promote(&set, &payload, queue).await? {
                log::debug!("promoter: moved one due job onto '{queue}'");
            }
        }
        Ok(())
    }
}
