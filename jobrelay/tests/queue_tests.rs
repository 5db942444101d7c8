//! Integration tests for the jobrelay job queue store.
//!
//! These tests use real SQLite databases in a temp directory to verify the
//! enqueue/claim/mark lifecycle against the actual schema.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use jobrelay::Error;
use jobrelay::database::models::{JobRecord, JobStatus};
use jobrelay::database::repositories::{
    ClaimOutcome, ClaimedJob, JobStore, MarkOutcome, SqlxJobStore,
};

/// Helper to create a store backed by a fresh database file.
async fn setup_store() -> (TempDir, SqlxJobStore) {
    let dir = TempDir::new().expect("create temp dir");
    let db_path = dir.path().join("queue.db");
    let url = format!(
        "sqlite:{}?mode=rwc",
        db_path.to_string_lossy().replace('\\', "/")
    );
    let store = SqlxJobStore::open(&url).await.expect("open store");
    (dir, store)
}

/// Claim, expecting a job to be there.
async fn claim_job(store: &dyn JobStore) -> ClaimedJob {
    match store.claim_next().await.expect("claim_next") {
        ClaimOutcome::Claimed(job) => job,
        other => panic!("expected a claimed job, got {other:?}"),
    }
}

mod enqueue_tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_then_claim_returns_same_job() {
        let (_dir, store) = setup_store().await;

        let params = json!({"kind": "export", "depth": 3});
        store.enqueue("job-1", &params).await.unwrap();

        let claimed = claim_job(&store).await;
        assert_eq!(claimed.id, "job-1");
        assert_eq!(claimed.params, params);
    }

    #[tokio::test]
    async fn test_duplicate_id_fails_and_leaves_first_untouched() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({"n": 1})).await.unwrap();
        let err = store.enqueue("job-1", &json!({"n": 2})).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateJob { ref id } if id == "job-1"));

        let record = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(record.parse_params().unwrap(), json!({"n": 1}));
        assert_eq!(record.get_status(), Some(JobStatus::Queued));
    }

    #[tokio::test]
    async fn test_enqueue_rejects_non_object_params() {
        let (_dir, store) = setup_store().await;

        let err = store.enqueue("job-1", &json!([1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert!(store.get_job("job-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_params_round_trip_deep_equal() {
        let (_dir, store) = setup_store().await;

        let params = json!({
            "name": "encode",
            "inputs": ["a.flv", "b.flv"],
            "options": {
                "preset": {"quality": 23, "two_pass": true},
                "tags": [1, 2.5, "x", null]
            }
        });
        store.enqueue("job-rt", &params).await.unwrap();

        let claimed = claim_job(&store).await;
        assert_eq!(claimed.params, params);
    }
}

mod claim_tests {
    use super::*;

    #[tokio::test]
    async fn test_claims_in_insertion_order_then_empty() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-a", &json!({"seq": 0})).await.unwrap();
        store.enqueue("job-b", &json!({"seq": 1})).await.unwrap();

        assert_eq!(claim_job(&store).await.id, "job-a");
        assert_eq!(claim_job(&store).await.id, "job-b");
        assert!(matches!(
            store.claim_next().await.unwrap(),
            ClaimOutcome::Empty
        ));
    }

    #[tokio::test]
    async fn test_claim_on_empty_queue() {
        let (_dir, store) = setup_store().await;
        assert!(matches!(
            store.claim_next().await.unwrap(),
            ClaimOutcome::Empty
        ));
    }

    #[tokio::test]
    async fn test_claimed_job_is_not_returned_again() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({})).await.unwrap();
        let claimed = claim_job(&store).await;
        assert_eq!(claimed.id, "job-1");

        assert!(matches!(
            store.claim_next().await.unwrap(),
            ClaimOutcome::Empty
        ));

        let record = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Some(JobStatus::Running));
        assert!(record.processed_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_yield_exactly_one_winner() {
        let (_dir, store) = setup_store().await;
        let store = Arc::new(store);

        store.enqueue("job-contested", &json!({})).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.claim_next().await.unwrap() },
            ));
        }

        let mut claimed = Vec::new();
        for handle in handles {
            if let ClaimOutcome::Claimed(job) = handle.await.unwrap() {
                claimed.push(job.id);
            }
        }

        assert_eq!(claimed, vec!["job-contested".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_claims_never_hand_out_the_same_job() {
        let (_dir, store) = setup_store().await;
        let store = Arc::new(store);

        for i in 0..3 {
            store.enqueue(&format!("job-{i}"), &json!({"seq": i})).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.claim_next().await.unwrap() },
            ));
        }

        let mut claimed = Vec::new();
        for handle in handles {
            if let ClaimOutcome::Claimed(job) = handle.await.unwrap() {
                claimed.push(job.id);
            }
        }

        claimed.sort();
        assert_eq!(claimed, vec!["job-0", "job-1", "job-2"]);
    }
}

mod mark_tests {
    use super::*;

    #[tokio::test]
    async fn test_mark_completed() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({})).await.unwrap();
        claim_job(&store).await;

        let outcome = store.mark_completed("job-1").await.unwrap();
        assert_eq!(outcome, MarkOutcome::Updated);

        let record = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Some(JobStatus::Completed));
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_mark_failed_records_error() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({})).await.unwrap();
        claim_job(&store).await;

        let outcome = store.mark_failed("job-1", "boom").await.unwrap();
        assert_eq!(outcome, MarkOutcome::Updated);

        let record = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Some(JobStatus::Failed));
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_mark_completed_on_missing_id_is_a_tagged_noop() {
        let (_dir, store) = setup_store().await;

        let outcome = store.mark_completed("no-such-job").await.unwrap();
        assert_eq!(outcome, MarkOutcome::NotFound);

        // No row was created.
        assert!(store.get_job("no-such-job").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_double_completion_reports_already_terminal() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({})).await.unwrap();
        claim_job(&store).await;

        assert_eq!(
            store.mark_completed("job-1").await.unwrap(),
            MarkOutcome::Updated
        );
        assert_eq!(
            store.mark_completed("job-1").await.unwrap(),
            MarkOutcome::AlreadyTerminal
        );
    }

    #[tokio::test]
    async fn test_mark_failed_after_completed_is_lenient() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({})).await.unwrap();
        claim_job(&store).await;
        store.mark_completed("job-1").await.unwrap();

        // The store never refuses a terminal transition; the tag is the only
        // signal that the prior state was already terminal.
        let outcome = store.mark_failed("job-1", "late failure").await.unwrap();
        assert_eq!(outcome, MarkOutcome::AlreadyTerminal);

        let record = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Some(JobStatus::Failed));
        assert_eq!(record.error.as_deref(), Some("late failure"));
    }

    #[tokio::test]
    async fn test_mark_on_queued_job_is_applied() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-1", &json!({})).await.unwrap();

        // Never claimed; the update still applies.
        let outcome = store.mark_completed("job-1").await.unwrap();
        assert_eq!(outcome, MarkOutcome::Updated);

        let record = store.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(record.get_status(), Some(JobStatus::Completed));
    }
}

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_two_jobs_drain_oldest_first() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-a", &json!({"t": 0})).await.unwrap();
        store.enqueue("job-b", &json!({"t": 1})).await.unwrap();

        let first = claim_job(&store).await;
        assert_eq!(first.id, "job-a");
        assert_eq!(first.params, json!({"t": 0}));

        let second = claim_job(&store).await;
        assert_eq!(second.id, "job-b");

        assert!(matches!(
            store.claim_next().await.unwrap(),
            ClaimOutcome::Empty
        ));
        assert_eq!(store.count_queued().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_persist_after_terminal_transitions() {
        let (_dir, store) = setup_store().await;

        store.enqueue("job-a", &json!({})).await.unwrap();
        store.enqueue("job-b", &json!({})).await.unwrap();

        claim_job(&store).await;
        store.mark_completed("job-a").await.unwrap();
        claim_job(&store).await;
        store.mark_failed("job-b", "boom").await.unwrap();

        // No deletion; terminal records remain for audit.
        let recent = store.list_recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
    }
}

mod worker_tests {
    use super::*;

    use async_trait::async_trait;
    use jobrelay::worker::{JobHandler, LoggingHandler, Worker, WorkerConfig};

    struct FailingHandler;

    #[async_trait]
    impl JobHandler for FailingHandler {
        async fn handle(&self, _job: &ClaimedJob) -> jobrelay::Result<()> {
            Err(Error::Other("handler exploded".to_string()))
        }
    }

    async fn wait_for_terminal(store: &dyn JobStore, id: &str) -> JobRecord {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(job) = store.get_job(id).await.unwrap()
                    && job.get_status().is_some_and(|s| s.is_terminal())
                {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("job did not reach a terminal status")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_completes_jobs() {
        let (_dir, store) = setup_store().await;
        let store: Arc<SqlxJobStore> = Arc::new(store);

        store.enqueue("job-ok", &json!({"kind": "noop"})).await.unwrap();

        let worker = Arc::new(Worker::new(
            store.clone(),
            WorkerConfig {
                poll_interval_ms: 10,
            },
            Arc::new(LoggingHandler),
        ));
        let cancel = worker.cancel_token();
        let handle = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.run().await })
        };

        let record = wait_for_terminal(store.as_ref(), "job-ok").await;
        assert_eq!(record.get_status(), Some(JobStatus::Completed));

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_worker_records_handler_failures() {
        let (_dir, store) = setup_store().await;
        let store: Arc<SqlxJobStore> = Arc::new(store);

        store.enqueue("job-bad", &json!({})).await.unwrap();

        let worker = Arc::new(Worker::new(
            store.clone(),
            WorkerConfig {
                poll_interval_ms: 10,
            },
            Arc::new(FailingHandler),
        ));
        let cancel = worker.cancel_token();
        let handle = {
            let worker = worker.clone();
            tokio::spawn(async move { worker.run().await })
        };

        let record = wait_for_terminal(store.as_ref(), "job-bad").await;
        assert_eq!(record.get_status(), Some(JobStatus::Failed));
        assert!(
            record
                .error
                .as_deref()
                .is_some_and(|e| e.contains("handler exploded"))
        );

        cancel.cancel();
        handle.await.unwrap().unwrap();
    }
}
