use std::time::Duration;

use serde::Serialize;

use crate::domain::{Job, Mode, RecordId};
use crate::efetch::RecordFetcher;
use crate::error::KiraError;
use crate::retry::{RetryPolicy, Sleeper};
use crate::store::{PersistTarget, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Saved,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub mode: Mode,
    pub id: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub started_at: String,
    pub finished_at: String,
    pub items: Vec<FetchItemResult>,
}

impl FetchResult {
    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == JobStatus::Failed)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    Attempt {
        id: String,
        attempt: u32,
    },
    Retry {
        id: String,
        wait: Duration,
        message: String,
    },
    Saved {
        id: String,
        path: String,
        completed: usize,
        total: usize,
    },
    Failed {
        id: String,
        attempts: u32,
        completed: usize,
        total: usize,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub fn retry_message(id: &RecordId, wait: Duration) -> String {
    format!(
        "Error trying to download {id}. Waiting {} seconds and retrying",
        wait.as_secs()
    )
}

/// Drives jobs one at a time through fetch, backoff and persistence.
#[derive(Clone)]
pub struct App<F: RecordFetcher, S: Sleeper> {
    store: Store,
    fetcher: F,
    sleeper: S,
    policy: RetryPolicy,
}

impl<F: RecordFetcher, S: Sleeper> App<F, S> {
    pub fn new(store: Store, fetcher: F, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            store,
            fetcher,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Processes `jobs` in order; job N+1 starts only after job N is saved
    /// or has run out of attempts.
    pub fn fetch_all(
        &self,
        jobs: &[Job],
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, KiraError> {
        let started_at = timestamp();
        let total = jobs.len();
        sink.event(ProgressEvent::Started { total });

        let mut items = Vec::with_capacity(total);
        for job in jobs {
            let item = self.fetch_job(job, items.len() + 1, total, sink)?;
            items.push(item);
        }

        Ok(FetchResult {
            started_at,
            finished_at: timestamp(),
            items,
        })
    }

    fn fetch_job(
        &self,
        job: &Job,
        position: usize,
        total: usize,
        sink: &dyn ProgressSink,
    ) -> Result<FetchItemResult, KiraError> {
        let target = PersistTarget::for_job(job)?;
        let mut backoff = self.policy.backoff();

        loop {
            self.sleeper.sleep(backoff.current_wait());
            backoff.record_attempt();
            sink.event(ProgressEvent::Attempt {
                id: job.id.to_string(),
                attempt: backoff.attempts(),
            });

            if let Some(text) = self.attempt(job)? {
                let path = self.store.persist(&target, &text)?;
                sink.event(ProgressEvent::Saved {
                    id: job.id.to_string(),
                    path: path.to_string(),
                    completed: position,
                    total,
                });
                return Ok(FetchItemResult {
                    mode: job.mode,
                    id: job.id.to_string(),
                    status: JobStatus::Saved,
                    attempts: backoff.attempts(),
                    path: Some(path.to_string()),
                });
            }

            if backoff.exhausted() {
                tracing::warn!(id = %job.id, attempts = backoff.attempts(), "giving up");
                sink.event(ProgressEvent::Failed {
                    id: job.id.to_string(),
                    attempts: backoff.attempts(),
                    completed: position,
                    total,
                });
                return Ok(FetchItemResult {
                    mode: job.mode,
                    id: job.id.to_string(),
                    status: JobStatus::Failed,
                    attempts: backoff.attempts(),
                    path: None,
                });
            }

            let wait = backoff.escalate();
            tracing::warn!(id = %job.id, wait_secs = wait.as_secs(), "download failed, retrying");
            sink.event(ProgressEvent::Retry {
                id: job.id.to_string(),
                wait,
                message: retry_message(&job.id, wait),
            });
        }
    }

    /// `Ok(None)` is a transient failure worth retrying.
    fn attempt(&self, job: &Job) -> Result<Option<String>, KiraError> {
        match self.fetcher.fetch(job) {
            Ok(outcome) if !outcome.failed => Ok(Some(outcome.text)),
            Ok(_) => Ok(None),
            Err(err @ KiraError::FetchTimeout { .. }) => {
                tracing::warn!(id = %job.id, "{err}");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_message_matches_console_format() {
        let id: RecordId = "NC_045512".parse().unwrap();
        assert_eq!(
            retry_message(&id, Duration::from_secs(8)),
            "Error trying to download NC_045512. Waiting 8 seconds and retrying"
        );
    }
}
