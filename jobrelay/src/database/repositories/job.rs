//! The job queue store.
//!
//! Durable storage and race-free handoff of jobs between producers and
//! consumers that do not otherwise coordinate. Claims run inside a
//! `BEGIN IMMEDIATE` transaction on the serialized write pool: the write
//! lock is acquired before the oldest queued row is read, so two concurrent
//! claimants can never both observe the same row as queued.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::SqliteConnection;

use crate::database::models::{JobRecord, JobStatus};
use crate::database::{self, DbPool, WritePool};
use crate::{Error, Result};

/// Outcome of a claim attempt.
///
/// An empty queue and a contended write lock are distinct, so callers can
/// choose differentiated backoff.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// The oldest queued job, now marked running.
    Claimed(ClaimedJob),
    /// No queued job exists.
    Empty,
    /// The write lock was contended; try again later.
    Contended,
}

/// A job handed to exactly one consumer.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: String,
    /// Deserialized producer-supplied parameters.
    pub params: Value,
    pub created_at: String,
    pub processed_at: String,
}

/// Outcome of a terminal-state update.
///
/// The update itself is always applied when the row exists; the tag only
/// reports the prior state for callers that want to assert on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The row existed and was not yet terminal.
    Updated,
    /// The row existed but was already completed or failed.
    AlreadyTerminal,
    /// No row with this id exists; nothing was created.
    NotFound,
}

/// Job store trait.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new queued job.
    ///
    /// `id` must be unique among all jobs ever inserted; `params` must be a
    /// JSON object. A duplicate id fails with [`Error::DuplicateJob`] and
    /// leaves the existing row unmodified. No internal retry is performed.
    async fn enqueue(&self, id: &str, params: &Value) -> Result<()>;

    /// Atomically claim the oldest queued job.
    async fn claim_next(&self) -> Result<ClaimOutcome>;

    /// Set `status = completed` for the row matching `id`.
    async fn mark_completed(&self, id: &str) -> Result<MarkOutcome>;

    /// Set `status = failed` and store `error` for the row matching `id`.
    async fn mark_failed(&self, id: &str, error: &str) -> Result<MarkOutcome>;

    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<JobRecord>>;
    async fn count_queued(&self) -> Result<u64>;
}

/// SQLx implementation of the job store.
///
/// Owns its pools explicitly; process-wide sharing is a caller concern
/// (clone the `Arc` it is handed around in) rather than a hidden global.
pub struct SqlxJobStore {
    read_pool: DbPool,
    write_pool: WritePool,
}

fn is_sqlite_busy(err: &sqlx::Error) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    msg.contains("database is locked") || msg.contains("database is busy")
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.is_unique_violation(),
        _ => false,
    }
}

impl SqlxJobStore {
    /// Open the store at `database_url`.
    ///
    /// Idempotent: the database file and the `jobs` table are created if
    /// absent. Storage-open failures are fatal to the caller; nothing else
    /// in the process works without the store.
    pub async fn open(database_url: &str) -> Result<Self> {
        let read_pool = database::init_pool(database_url).await?;
        let write_pool = database::init_write_pool(database_url).await?;
        database::init_schema(&read_pool).await?;

        Ok(Self {
            read_pool,
            write_pool,
        })
    }

    /// Wrap pre-configured pools. The schema is still created if absent.
    ///
    /// Used by tests that need non-default pool settings (e.g. a short busy
    /// timeout to force contention).
    pub async fn with_pools(read_pool: DbPool, write_pool: WritePool) -> Result<Self> {
        database::init_schema(&read_pool).await?;
        Ok(Self {
            read_pool,
            write_pool,
        })
    }

    /// Select-and-update step of a claim, inside an open immediate transaction.
    async fn claim_in_tx(
        tx: &mut SqliteConnection,
    ) -> std::result::Result<Option<(JobRecord, String)>, sqlx::Error> {
        let row = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT id, params, status, created_at, processed_at, error
            FROM jobs
            WHERE status = 'queued'
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = row else {
            return Ok(None);
        };

        let processed_at = Utc::now().to_rfc3339();
        let updated = sqlx::query(
            "UPDATE jobs SET status = 'running', processed_at = ? WHERE id = ? AND status = 'queued'",
        )
        .bind(&processed_at)
        .bind(&job.id)
        .execute(&mut *tx)
        .await?;

        // The immediate lock makes a zero-row update impossible; treat it as
        // empty rather than guessing.
        if updated.rows_affected() != 1 {
            return Ok(None);
        }

        Ok(Some((job, processed_at)))
    }

    /// Apply a terminal status inside an immediate transaction, reading the
    /// prior status for the outcome tag. The update is unconditional: the
    /// store never refuses a terminal transition.
    async fn mark_terminal(
        &self,
        id: &str,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<MarkOutcome> {
        let mut tx = database::begin_immediate(&self.write_pool).await?;

        let prior: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(prior) = prior else {
            tx.rollback().await?;
            return Ok(MarkOutcome::NotFound);
        };

        match error {
            Some(error) => {
                sqlx::query("UPDATE jobs SET status = ?, error = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(error)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE jobs SET status = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        if JobStatus::parse(&prior).is_some_and(|s| s.is_terminal()) {
            Ok(MarkOutcome::AlreadyTerminal)
        } else {
            Ok(MarkOutcome::Updated)
        }
    }
}

#[async_trait]
impl JobStore for SqlxJobStore {
    async fn enqueue(&self, id: &str, params: &Value) -> Result<()> {
        if !params.is_object() {
            return Err(Error::validation("job params must be a JSON object"));
        }

        let record = JobRecord::new(id, serde_json::to_string(params)?);

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, params, status, created_at, processed_at, error)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.params)
        .bind(&record.status)
        .bind(&record.created_at)
        .bind(&record.processed_at)
        .bind(&record.error)
        .execute(&self.write_pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(job_id = %record.id, "job enqueued");
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(Error::duplicate_job(record.id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_next(&self) -> Result<ClaimOutcome> {
        let mut tx = match database::begin_immediate(&self.write_pool).await {
            Ok(tx) => tx,
            Err(e) if is_sqlite_busy(&e) => {
                tracing::debug!("claim_next: write lock contended at begin");
                return Ok(ClaimOutcome::Contended);
            }
            Err(e) => return Err(e.into()),
        };

        match Self::claim_in_tx(&mut tx).await {
            Ok(Some((job, processed_at))) => match tx.commit().await {
                Ok(()) => {
                    let params = serde_json::from_str(&job.params)?;
                    tracing::debug!(job_id = %job.id, "job claimed");
                    Ok(ClaimOutcome::Claimed(ClaimedJob {
                        id: job.id,
                        params,
                        created_at: job.created_at,
                        processed_at,
                    }))
                }
                Err(e) if is_sqlite_busy(&e) => {
                    tracing::debug!(error = %e, "claim_next: commit contended, rolled back");
                    Ok(ClaimOutcome::Contended)
                }
                Err(e) => Err(e.into()),
            },
            Ok(None) => {
                tx.rollback().await?;
                Ok(ClaimOutcome::Empty)
            }
            Err(e) if is_sqlite_busy(&e) => {
                let _ = tx.rollback().await;
                tracing::debug!(error = %e, "claim_next: transaction contended, rolled back");
                Ok(ClaimOutcome::Contended)
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e.into())
            }
        }
    }

    async fn mark_completed(&self, id: &str) -> Result<MarkOutcome> {
        self.mark_terminal(id, JobStatus::Completed, None).await
    }

    async fn mark_failed(&self, id: &str, error: &str) -> Result<MarkOutcome> {
        self.mark_terminal(id, JobStatus::Failed, Some(error)).await
    }

    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        let job = sqlx::query_as::<_, JobRecord>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.read_pool)
            .await?;
        Ok(job)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<JobRecord>> {
        let jobs = sqlx::query_as::<_, JobRecord>(
            "SELECT * FROM jobs ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.read_pool)
        .await?;
        Ok(jobs)
    }

    async fn count_queued(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = 'queued'")
            .fetch_one(&self.read_pool)
            .await?;
        Ok(count as u64)
    }
}
