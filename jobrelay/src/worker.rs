//! Job consumer.
//!
//! Polls the store for queued jobs, hands each to a [`JobHandler`], and
//! records the terminal status. An empty queue sleeps the idle interval;
//! transient write-lock contention backs off for a shorter, jittered
//! interval — the two cases are distinguishable because `claim_next`
//! returns a tagged outcome.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::random;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::database::repositories::{ClaimOutcome, ClaimedJob, JobStore};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Idle poll interval in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

impl WorkerConfig {
    /// Load worker config from environment variables, falling back to defaults.
    ///
    /// Supported env vars: `WORKER_POLL_INTERVAL_MS`.
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("WORKER_POLL_INTERVAL_MS")
            && let Ok(parsed) = interval.parse::<u64>()
        {
            config.poll_interval_ms = parsed;
        }

        config
    }
}

/// Handles one claimed job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &ClaimedJob) -> Result<()>;
}

/// Default handler: logs the payload and succeeds.
///
/// Real processing is out-of-band by design; deployments substitute their
/// own handler.
pub struct LoggingHandler;

#[async_trait]
impl JobHandler for LoggingHandler {
    async fn handle(&self, job: &ClaimedJob) -> Result<()> {
        info!(job_id = %job.id, params = %job.params, "processing job");
        Ok(())
    }
}

/// The polling consumer loop.
pub struct Worker {
    store: Arc<dyn JobStore>,
    handler: Arc<dyn JobHandler>,
    config: WorkerConfig,
    cancel_token: CancellationToken,
}

impl Worker {
    pub fn new(
        store: Arc<dyn JobStore>,
        config: WorkerConfig,
        handler: Arc<dyn JobHandler>,
    ) -> Self {
        Self {
            store,
            handler,
            config,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Run until cancelled. Storage errors outside the claim transaction
    /// propagate; contention does not.
    pub async fn run(&self) -> Result<()> {
        info!("worker started");

        while !self.cancel_token.is_cancelled() {
            match self.store.claim_next().await? {
                ClaimOutcome::Claimed(job) => self.process(job).await,
                ClaimOutcome::Empty => self.idle(self.config.poll_interval_ms).await,
                ClaimOutcome::Contended => {
                    // Someone else holds the write lock; retry sooner than the
                    // idle interval, with jitter to avoid lockstep retries.
                    let backoff_ms = self.config.poll_interval_ms / 4 + random::<u64>() % 50;
                    self.idle(backoff_ms).await;
                }
            }
        }

        info!("worker stopped");
        Ok(())
    }

    async fn idle(&self, ms: u64) {
        tokio::select! {
            _ = self.cancel_token.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_millis(ms)) => {}
        }
    }

    async fn process(&self, job: ClaimedJob) {
        let job_id = job.id.clone();

        match self.handler.handle(&job).await {
            Ok(()) => match self.store.mark_completed(&job_id).await {
                Ok(outcome) => info!(job_id = %job_id, ?outcome, "job completed"),
                Err(e) => warn!(job_id = %job_id, error = %e, "failed to record completion"),
            },
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "job failed");
                if let Err(e) = self.store.mark_failed(&job_id, &e.to_string()).await {
                    warn!(job_id = %job_id, error = %e, "failed to record failure");
                }
            }
        }
    }
}
