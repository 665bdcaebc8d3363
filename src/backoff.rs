use std::time::Duration;

/// Exponential delay between retries of a failing store operation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BackoffPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(5),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        match prev {
            None => self.first,
            Some(d) => {
                let next = (d.as_secs_f64() * self.factor).min(self.max.as_secs_f64());
                Duration::from_secs_f64(next)
            }
        }
    }
}
