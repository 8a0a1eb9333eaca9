use std::thread;
use std::time::Duration;

pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(2);

/// Backoff for a single job: wait, attempt, double the wait on failure.
///
/// `max_attempts: None` keeps retrying until the job succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_wait: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_wait: DEFAULT_INITIAL_WAIT,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn backoff(&self) -> Backoff {
        Backoff {
            wait: self.initial_wait,
            attempts: 0,
            max_attempts: self.max_attempts,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Backoff {
    wait: Duration,
    attempts: u32,
    max_attempts: Option<u32>,
}

impl Backoff {
    /// Wait to sleep before the next attempt.
    pub fn current_wait(&self) -> Duration {
        self.wait
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn exhausted(&self) -> bool {
        self.max_attempts
            .map(|max| self.attempts >= max)
            .unwrap_or(false)
    }

    /// Doubles the wait with no upper bound and returns the new value.
    pub fn escalate(&mut self) -> Duration {
        self.wait = self.wait.saturating_mul(2);
        self.wait
    }
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
