//! Background Scheduler.
//!
//! Each periodic job is one tokio task: wait for the tick, check the network
//! precondition, run the job, and on `Retry` back off and try again until the
//! policy's attempt budget is spent. Retries are gated by the same
//! precondition; an offline retry waits another backoff step without using
//! up an attempt. Names are unique; registering a name that is still active
//! keeps the existing task.
//!
//! Per-run state machine: Scheduled → Running → {Success, Retry}, where Retry
//! re-enters Scheduled after the backoff delay.

pub mod connectivity;
pub mod retry;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::sync::SyncOutcome;

pub use connectivity::{AlwaysOnline, Connectivity, HostReachability};
pub use retry::RetryPolicy;

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> SyncOutcome;
}

pub struct Scheduler {
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
    connectivity: Arc<dyn Connectivity>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        connectivity: Arc<dyn Connectivity>,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            connectivity,
            retry,
            cancel,
        }
    }

    /// Registers `job` to run every `interval`, starting immediately.
    /// Returns `false` (and changes nothing) if a job with the same name is
    /// still active.
    pub fn register_periodic(&self, job: Arc<dyn Job>, interval: Duration) -> bool {
        let name = job.name().to_string();
        let mut jobs = self.lock();

        if jobs.get(&name).is_some_and(|handle| !handle.is_finished()) {
            debug!("Job '{name}' already scheduled, keeping existing");
            return false;
        }

        let connectivity = self.connectivity.clone();
        let retry = self.retry;
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(periodic_loop(job, interval, connectivity, retry, cancel));
        jobs.insert(name.clone(), handle);

        info!("Scheduled '{name}' every {}s", interval.as_secs());
        true
    }

    /// Runs `job` once right away, outside its periodic schedule, with the
    /// same retry policy. The network precondition is not checked.
    pub fn run_now(&self, job: Arc<dyn Job>) -> JoinHandle<SyncOutcome> {
        let retry = self.retry;
        let cancel = self.cancel.child_token();
        tokio::spawn(async move { run_with_retry(job.as_ref(), &retry, None, &cancel).await })
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.lock()
            .get(name)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops a periodic job. Returns `false` if no such job was registered.
    pub fn cancel(&self, name: &str) -> bool {
        match self.lock().remove(name) {
            Some(handle) => {
                handle.abort();
                info!("Cancelled '{name}'");
                true
            }
            None => false,
        }
    }

    /// Cancels every job and waits for the tasks to wind down.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<(String, JoinHandle<()>)> = self.lock().drain().collect();
        for (name, handle) in handles {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!("Job '{name}' ended abnormally: {e}");
                }
            }
        }
        info!("Scheduler stopped");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn periodic_loop(
    job: Arc<dyn Job>,
    interval: Duration,
    connectivity: Arc<dyn Connectivity>,
    retry: RetryPolicy,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !connectivity.is_online().await {
            debug!("'{}' deferred: backend unreachable", job.name());
            continue;
        }

        run_with_retry(job.as_ref(), &retry, Some(connectivity.as_ref()), &cancel).await;
    }
    debug!("'{}' loop exited", job.name());
}

/// Runs `job` until it succeeds, the attempt budget is spent, or `cancel`
/// fires. Returns the last outcome. With `connectivity`, a retry only runs
/// once the backend is reachable again.
pub async fn run_with_retry(
    job: &dyn Job,
    retry: &RetryPolicy,
    connectivity: Option<&dyn Connectivity>,
    cancel: &CancellationToken,
) -> SyncOutcome {
    let mut failed_attempts = 0;

    loop {
        let run_id = Uuid::new_v4();
        let span = info_span!("job", name = job.name(), %run_id, attempt = failed_attempts + 1);
        let outcome = job.run().instrument(span).await;

        let reason = match &outcome {
            SyncOutcome::Success => return outcome,
            SyncOutcome::Retry { reason } => reason.clone(),
        };
        failed_attempts += 1;

        let Some(delay) = retry.delay_after(failed_attempts) else {
            error!(
                "'{}' gave up after {failed_attempts} attempts: {reason}",
                job.name()
            );
            return outcome;
        };

        warn!(
            "'{}' attempt {failed_attempts} failed ({reason}), retrying in {}s",
            job.name(),
            delay.as_secs()
        );
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return outcome,
                _ = tokio::time::sleep(delay) => {}
            }
            let online = match connectivity {
                Some(check) => check.is_online().await,
                None => true,
            };
            if online {
                break;
            }
            debug!("'{}' retry deferred: backend unreachable", job.name());
        }
    }
}
