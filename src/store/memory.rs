use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{self, Instant};

use super::Store;
use crate::error::QueueError;

/// In-process [`Store`] with the same observable semantics as
/// [`RedisStore`](super::RedisStore): FIFO lists, a scored scheduled set,
/// and at-most-once promotion. Not shared across processes; meant for
/// local development and tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    wakeup: Notify,
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, Vec<(i64, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_pop(&self, queues: &[String]) -> Option<(String, String)> {
        let mut state = self.state();
        for queue in queues {
            if let Some(payload) = state.queues.get_mut(queue).and_then(VecDeque::pop_front) {
                return Some((queue.clone(), payload));
            }
        }
        None
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn push(&self, queue: &str, payload: String) -> Result<(), QueueError> {
        self.state()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(payload);
        self.wakeup.notify_waiters();
        Ok(())
    }

    async fn blocking_pop(
        &self,
        queues: &[String],
        timeout: Duration,
    ) -> Result<Option<(String, String)>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for wakeups before checking, so a push that lands
            // between the check and the await still wakes this waiter.
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(popped) = self.try_pop(queues) {
                return Ok(Some(popped));
            }
            if time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn schedule(&self, set: &str, score: i64, payload: String) -> Result<(), QueueError> {
        let mut state = self.state();
        let members = state.sets.entry(set.to_string()).or_default();
        if let Some(member) = members.iter_mut().find(|member| member.1 == payload) {
            member.0 = score;
        } else {
            members.push((score, payload));
        }
        // stable sort keeps insertion order among equal scores
        members.sort_by_key(|member| member.0);
        Ok(())
    }

    async fn due(&self, set: &str, now: i64) -> Result<Vec<String>, QueueError> {
        let state = self.state();
        let due = state
            .sets
            .get(set)
            .map(|members| {
                members
                    .iter()
                    .take_while(|member| member.0 <= now)
                    .map(|member| member.1.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(due)
    }

    async fn promote(&self, set: &str, payload: &str, queue: &str) -> Result<bool, QueueError> {
        let mut state = self.state();
        let removed = match state.sets.get_mut(set) {
            Some(members) => match members.iter().position(|member| member.1 == payload) {
                Some(index) => {
                    members.remove(index);
                    true
                }
                None => false,
            },
            None => false,
        };

        if removed {
            state
                .queues
                .entry(queue.to_string())
                .or_default()
                .push_back(payload.to_string());
            self.wakeup.notify_waiters();
        }
        Ok(removed)
    }
}
