/// Retry controller tests
///
/// Conflict handling, fibonacci backoff and cancellation of conditional writes.
/// Run with: cargo test --test retry_controller_tests
mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::{InterferingStore, seed};
use rustocc::{
    CancellationToken, ClientWins, InMemoryVersionedStore, NewerWins, OccError, RejectOnConflict,
    RetryController, RetryPolicy, StoreWins, Timestamped, VersionToken, VersionedStore,
    WriteIntent,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Note {
    text: String,
    updated_at: chrono::DateTime<Utc>,
}

impl Note {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            updated_at: Utc::now(),
        }
    }
}

impl Timestamped for Note {
    fn updated_at(&self) -> chrono::DateTime<Utc> {
        self.updated_at
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new()
        .backoff_unit(Duration::from_millis(100))
        .max_backoff(Duration::from_millis(500))
}

fn counter_store() -> InterferingStore<u64, i64> {
    InterferingStore::new(|value: &i64| value + 1000)
}

#[tokio::test]
async fn test_commit_without_conflict_uses_one_attempt() {
    let store = InMemoryVersionedStore::<u64, i64>::new();
    let baseline = seed(&store, 1, 10).await;

    let committed = RetryController::default()
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, 11),
            &RejectOnConflict,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(committed.value, 11);
    assert_eq!(committed.attempts, 1);
    let stored = store.read(&1).await.unwrap().unwrap();
    assert_eq!(stored.value, 11);
    assert_eq!(stored.token, committed.token);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_grows_along_fibonacci() {
    let store = counter_store();
    let baseline = seed(&store, 1, 0).await;
    store.interfere(1, 3);

    let started = Instant::now();
    let committed = RetryController::new(fast_policy())
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, 1),
            &ClientWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // Waits of 1, 1 and 2 units before the fourth attempt.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(400), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "elapsed {elapsed:?}");
    assert_eq!(committed.attempts, 4);
    assert_eq!(store.caller_writes(), 4);
    assert_eq!(store.inner.read(&1).await.unwrap().unwrap().value, 1);
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted_after_ceiling() {
    let store = counter_store();
    let baseline = seed(&store, 1, 0).await;
    store.interfere(1, 100);

    let started = Instant::now();
    let err = RetryController::new(fast_policy())
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, 1),
            &ClientWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        OccError::RetriesExhausted {
            key: "1".to_string(),
            attempts: 6
        }
    );
    assert!(err.is_retriable());
    // 1 + 1 + 2 + 3 + 5 units
    assert!(started.elapsed() >= Duration::from_millis(1200));
    assert_eq!(store.caller_writes(), 6);

    // Only the interfering writer ever committed.
    let stored = store.inner.read(&1).await.unwrap().unwrap();
    assert_eq!(stored.value, 6000);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    let policy = RetryPolicy::new()
        .max_retries(8)
        .backoff_unit(Duration::from_millis(100))
        .max_backoff(Duration::from_millis(300));
    let store = counter_store();
    let baseline = seed(&store, 1, 0).await;
    store.interfere(1, 6);

    let started = Instant::now();
    let committed = RetryController::new(policy)
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, 1),
            &ClientWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    // 1, 1, 2, 3, 5, 8 units capped at 3 units each
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1400), "elapsed {elapsed:?}");
    assert_eq!(committed.attempts, 7);
}

#[tokio::test]
async fn test_reject_on_conflict_aborts_without_writing() {
    let store = counter_store();
    let baseline = seed(&store, 1, 0).await;
    store.interfere(1, 1);

    let err = RetryController::new(fast_policy())
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, 1),
            &RejectOnConflict,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OccError::Aborted { .. }));
    assert_eq!(err.status_code(), 409);
    assert_eq!(store.caller_writes(), 1);
    assert_eq!(store.inner.read(&1).await.unwrap().unwrap().value, 1000);
}

#[tokio::test(start_paused = true)]
async fn test_store_wins_rewrites_remote_value() {
    let store = counter_store();
    let baseline = seed(&store, 1, 0).await;
    store.interfere(1, 1);

    let committed = RetryController::new(fast_policy())
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, 1),
            &StoreWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(committed.value, 1000);
    assert_eq!(committed.attempts, 2);
    let stored = store.inner.read(&1).await.unwrap().unwrap();
    assert_eq!(stored.value, 1000);
    assert_eq!(stored.token, committed.token);
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let store = InMemoryVersionedStore::<u64, i64>::new();
    let baseline = rustocc::VersionedRecord::new(0, VersionToken::generate());

    let err = RetryController::default()
        .execute(
            &store,
            &9,
            WriteIntent::new(baseline, 1),
            &ClientWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, OccError::NotFound("9".to_string()));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_cancelled_before_first_attempt() {
    let store = counter_store();
    let baseline = seed(&store, 1, 0).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = RetryController::default()
        .execute(&store, &1, WriteIntent::new(baseline, 1), &ClientWins, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(store.caller_writes(), 0);
    assert_eq!(store.inner.read(&1).await.unwrap().unwrap().value, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_backoff() {
    let store = Arc::new(counter_store());
    let baseline = seed(&*store, 1, 0).await;
    store.interfere(1, 100);

    let cancel = CancellationToken::new();
    let canceller = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        })
    };

    let started = Instant::now();
    let err = RetryController::default()
        .execute(&*store, &1, WriteIntent::new(baseline, 1), &ClientWins, &cancel)
        .await
        .unwrap_err();
    canceller.await.unwrap();

    assert_eq!(err, OccError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(store.caller_writes(), 1);
    assert_eq!(store.inner.read(&1).await.unwrap().unwrap().value, 1000);
}

#[tokio::test]
async fn test_newer_wins_aborts_when_remote_is_newer() {
    let store = InterferingStore::new(|_: &Note| Note {
        text: "edited elsewhere".to_string(),
        updated_at: Utc::now() + ChronoDuration::hours(1),
    });
    let baseline = seed(&store, 1u64, Note::new("draft")).await;
    store.interfere(1, 1);

    let err = RetryController::new(fast_policy())
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, Note::new("mine")),
            &NewerWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OccError::Aborted { .. }));
    let stored = store.inner.read(&1).await.unwrap().unwrap();
    assert_eq!(stored.value.text, "edited elsewhere");
}

#[tokio::test(start_paused = true)]
async fn test_newer_wins_retries_over_older_remote() {
    let store = InterferingStore::new(|note: &Note| Note {
        text: "stale edit".to_string(),
        updated_at: note.updated_at - ChronoDuration::hours(1),
    });
    let baseline = seed(&store, 1u64, Note::new("draft")).await;
    store.interfere(1, 1);

    let committed = RetryController::new(fast_policy())
        .execute(
            &store,
            &1,
            WriteIntent::new(baseline, Note::new("mine")),
            &NewerWins,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(committed.attempts, 2);
    let stored = store.inner.read(&1).await.unwrap().unwrap();
    assert_eq!(stored.value.text, "mine");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_same_token_commit_once() {
    let store = Arc::new(InMemoryVersionedStore::<u64, i64>::new());
    let baseline = seed(&*store, 1, 0).await;
    let controller = RetryController::new(fast_policy());

    let mut handles = Vec::new();
    for writer in 1..=8i64 {
        let store = Arc::clone(&store);
        let baseline = baseline.clone();
        let controller = controller.clone();
        handles.push(tokio::spawn(async move {
            controller
                .execute(
                    &*store,
                    &1,
                    WriteIntent::new(baseline, writer),
                    &RejectOnConflict,
                    &CancellationToken::new(),
                )
                .await
        }));
    }

    let mut committed = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(result) => committed.push(result),
            Err(err) => assert!(matches!(err, OccError::Aborted { .. }), "{err}"),
        }
    }

    assert_eq!(committed.len(), 1);
    let stored = store.read(&1).await.unwrap().unwrap();
    assert_eq!(stored.value, committed[0].value);
    assert_eq!(stored.token, committed[0].token);
}
