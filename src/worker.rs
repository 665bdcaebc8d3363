use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::failure::{Failure, FailureHandler};
use crate::registry::JobRegistry;
use crate::store::Store;

/// One consumer loop: pop, decode, execute, report.
pub(crate) struct Worker {
    pub id: usize,
    pub store: Arc<dyn Store>,
    pub registry: Arc<JobRegistry>,
    pub failure: Arc<dyn FailureHandler>,
    pub queues: Vec<String>,
    pub pop_timeout: Duration,
    pub job_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub shutdown: CancellationToken,
}

impl Worker {
    pub async fn run(self) {
        log::debug!("worker {} started", self.id);

        // Stagger the rotation start so workers do not all favor the
        // same queue.
        let mut rotation = self.id;
        let mut retry_delay = None;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let queues = rotated(&self.queues, rotation);
            rotation = rotation.wrapping_add(1);

            let popped = tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,
                popped = self.store.blocking_pop(&queues, self.pop_timeout) => popped,
            };

            match popped {
                Ok(Some((queue, payload))) => {
                    retry_delay = None;
                    self.process(&queue, payload).await;
                }
                Ok(None) => {
                    // pop timed out; loop around and re-check shutdown
                    retry_delay = None;
                }
                Err(error) => {
                    let delay = self.backoff.next(retry_delay);
                    retry_delay = Some(delay);
                    log::warn!(
                        "worker {}: store error ({}), retrying in {:?}: {error}",
                        self.id,
                        error.as_label(),
                        delay
                    );

                    let sleep = time::sleep(delay);
                    tokio::pin!(sleep);
                    tokio::select! {
                        biased;

                        _ = self.shutdown.cancelled() => break,
                        _ = &mut sleep => {}
                    }
                }
            }
        }

        log::debug!("worker {} stopped", self.id);
    }

    async fn process(&self, queue: &str, payload: String) {
        let job = match self.registry.decode(&payload) {
            Ok(job) => job,
            Err(error) => {
                self.failure
                    .on_failure(&Failure::Decode {
                        queue: queue.to_string(),
                        payload,
                        error,
                    })
                    .await;
                return;
            }
        };
        let name = job.name().to_string();

        // Per-job signal: fires on the timeout below or on pool shutdown.
        let cancel = self.shutdown.child_token();
        let timer = (!self.job_timeout.is_zero()).then(|| {
            let deadline = self.job_timeout;
            let cancel = cancel.clone();
            tokio::spawn(async move {
                time::sleep(deadline).await;
                cancel.cancel();
            })
        });

        // The handler is never killed, even past its timeout; a handler
        // that ignores the signal occupies this worker until it returns.
        let result = std::panic::AssertUnwindSafe(job.execute(cancel.clone()))
            .catch_unwind()
            .await;

        // The child token only cancels through the timer or pool shutdown,
        // so this cleanly distinguishes an overrun from a drain.
        let timed_out = timer.is_some() && cancel.is_cancelled() && !self.shutdown.is_cancelled();
        if let Some(timer) = timer {
            timer.abort();
        }

        match result {
            Ok(Ok(())) => {
                log::debug!("worker {}: job '{name}' completed", self.id);
            }
            Ok(Err(error)) => {
                self.failure
                    .on_failure(&Failure::Execution { job, error })
                    .await;
            }
            Err(panic) => {
                self.failure
                    .on_failure(&Failure::Panic {
                        job: name.clone(),
                        message: panic_message(panic),
                    })
                    .await;
            }
        }

        if timed_out {
            self.failure
                .on_failure(&Failure::Timeout {
                    job: name,
                    timeout: self.job_timeout,
                })
                .await;
        }
    }
}

/// The queue list shifted left by `shift`, wrapping, so successive pops
/// give every queue a turn at the front.
fn rotated(queues: &[String], shift: usize) -> Vec<String> {
    let mut rotated = queues.to_vec();
    rotated.rotate_left(shift % queues.len());
    rotated
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "opaque panic payload".to_string()
    }
}
