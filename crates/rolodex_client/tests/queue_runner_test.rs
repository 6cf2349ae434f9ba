//! Tests for queue-driven batch processing loops.

mod common;

use common::{err_raw, fast_config, MockTransport, Scripted};
use rolodex_client::{EnrichmentClient, Priority, StopReason};
use rolodex_error::RolodexErrorKind;
use std::collections::HashMap;
use std::sync::Arc;

fn meta() -> HashMap<String, serde_json::Value> {
    HashMap::new()
}

#[tokio::test]
async fn one_batch_settles_queue_outcomes() {
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), fast_config());
    client
        .enqueue_many(["a", "b", "c"], Priority::Normal, meta())
        .await;

    let result = client
        .process_queue_batch(Some(10), None)
        .await
        .expect("batch should succeed");
    assert_eq!(*result.processed(), 3);
    assert_eq!(*result.succeeded(), 3);
    assert_eq!(*result.failed(), 0);

    let stats = result.stats();
    assert_eq!(*stats.completed(), 3);
    assert_eq!(*stats.in_flight(), 0);
    assert_eq!(*stats.daily_processed(), 3);
}

#[tokio::test]
async fn an_empty_queue_is_a_quiet_noop() {
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), fast_config());

    let result = client
        .process_queue_batch(None, None)
        .await
        .expect("empty queue is not an error");
    assert_eq!(*result.processed(), 0);
    assert_eq!(mock.reveal_calls(), 0);
    assert_eq!(mock.credit_calls(), 0, "no precheck for an empty pull");
}

#[tokio::test]
async fn failed_items_cycle_back_until_their_retries_run_out() {
    let mut config = fast_config();
    config.queue.max_retries = 2;
    let mock = Arc::new(MockTransport::with_script([
        Scripted::Raw(err_raw(404, "contact not found")),
        Scripted::Raw(err_raw(404, "contact not found")),
    ]));
    let client = EnrichmentClient::new(Arc::clone(&mock), config);
    client.enqueue("flaky", Priority::Normal, meta()).await;

    let result = client
        .process_queue_batch(Some(1), None)
        .await
        .expect("first pass");
    assert_eq!(*result.failed(), 1);
    assert_eq!(*result.stats().pending(), 1, "one retry left, re-enqueued");

    let result = client
        .process_queue_batch(Some(1), None)
        .await
        .expect("second pass");
    assert_eq!(*result.failed(), 1);
    assert_eq!(*result.stats().pending(), 0);
    assert_eq!(*result.stats().failed(), 1, "retry ceiling reached");

    let queue_stats = client.queue_stats().await;
    assert_eq!(*queue_stats.failed(), 1);
    assert_eq!(*queue_stats.daily_processed(), 0);
}

#[tokio::test]
async fn until_empty_drains_the_queue() {
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), fast_config());
    client
        .enqueue_many(["a", "b", "c", "d", "e"], Priority::Normal, meta())
        .await;

    let summary = client
        .process_queue_until_empty(Some(2), None, None, None)
        .await
        .expect("drain should succeed");
    assert_eq!(*summary.stop_reason(), StopReason::QueueEmpty);
    assert_eq!(*summary.batches_run(), 3, "2 + 2 + 1 items");
    assert_eq!(*summary.total_processed(), 5);
    assert_eq!(*summary.total_succeeded(), 5);
    assert_eq!(*summary.stats().completed(), 5);
}

#[tokio::test(start_paused = true)]
async fn inter_batch_pauses_happen_only_between_batches() {
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), fast_config());
    client
        .enqueue_many(["a", "b", "c", "d", "e"], Priority::Normal, meta())
        .await;

    let started = tokio::time::Instant::now();
    let summary = client
        .process_queue_until_empty(
            Some(1),
            None,
            None,
            Some(std::time::Duration::from_secs(1)),
        )
        .await
        .expect("drain should succeed");
    let elapsed = started.elapsed();

    assert_eq!(*summary.batches_run(), 5);
    // Five batches bracket four pauses; a pause after the last batch
    // would push this to five seconds.
    assert!(
        elapsed >= std::time::Duration::from_secs(4)
            && elapsed < std::time::Duration::from_secs(5),
        "expected four inter-batch pauses, elapsed {elapsed:?}"
    );
}

#[tokio::test]
async fn until_empty_honors_the_batch_ceiling_for_a_run() {
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), fast_config());
    client
        .enqueue_many(["a", "b", "c", "d", "e"], Priority::Normal, meta())
        .await;

    let summary = client
        .process_queue_until_empty(Some(1), Some(2), None, None)
        .await
        .expect("run should succeed");
    assert_eq!(*summary.stop_reason(), StopReason::MaxBatchesReached);
    assert_eq!(*summary.batches_run(), 2);
    assert_eq!(*summary.total_processed(), 2);
    assert_eq!(*summary.stats().pending(), 3, "the rest stays queued");
}

#[tokio::test]
async fn until_empty_stops_when_queue_slots_run_out() {
    let mut config = fast_config();
    config.queue.daily_limit = 2;
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), config);
    client
        .enqueue_many(["a", "b", "c", "d"], Priority::Normal, meta())
        .await;

    let summary = client
        .process_queue_until_empty(Some(1), None, None, None)
        .await
        .expect("run should succeed");
    assert_eq!(*summary.stop_reason(), StopReason::DailyQuotaExhausted);
    assert_eq!(*summary.total_processed(), 2);
    assert_eq!(*summary.stats().pending(), 2);
}

#[tokio::test]
async fn daily_credit_exhaustion_fails_remaining_items_without_calls() {
    let mut config = fast_config();
    config.limits.daily_credit_limit = 3;
    config.queue.max_retries = 1;
    let mock = Arc::new(MockTransport::new());
    let client = EnrichmentClient::new(Arc::clone(&mock), config);
    client
        .enqueue_many(["a", "b", "c", "d", "e"], Priority::Normal, meta())
        .await;

    let summary = client
        .process_queue_until_empty(Some(1), None, None, None)
        .await
        .expect("quota failures settle as item failures, not run errors");

    assert_eq!(*summary.total_succeeded(), 3, "the daily quota covered three");
    assert_eq!(*summary.total_failed(), 2);
    assert_eq!(*summary.stop_reason(), StopReason::QueueEmpty);

    assert_eq!(mock.reveal_calls(), 3, "rejected admits never reach transport");
    assert_eq!(mock.credit_calls(), 1, "the precheck is cached across batches");

    let queue_stats = client.queue_stats().await;
    assert_eq!(*queue_stats.daily_processed(), 3);
    assert_eq!(*queue_stats.failed(), 2);
    assert_eq!(*queue_stats.pending(), 0);

    let status = client.quota_status().await;
    assert_eq!((*status.used(), *status.limit()), (3, 3));
}

#[tokio::test]
async fn an_aborted_batch_restores_its_items_without_spending_retries() {
    let mut config = fast_config();
    config.queue.max_retries = 1;
    config.client.credit_cache_ttl_secs = 0;
    let mock = Arc::new(MockTransport::new());
    mock.set_credits_remaining(0);
    let client = EnrichmentClient::new(Arc::clone(&mock), config);
    client.enqueue("stranded", Priority::Normal, meta()).await;

    // Two aborts in a row; with only one retry in the budget, either abort
    // would have failed the item permanently if it counted as a failure.
    for _ in 0..2 {
        let error = client
            .process_queue_batch(Some(1), None)
            .await
            .expect_err("the credit precheck should abort the batch");
        assert!(matches!(error.kind(), RolodexErrorKind::Quota(_)));
    }
    assert_eq!(mock.reveal_calls(), 0);

    let stats = client.queue_stats().await;
    assert_eq!(*stats.in_flight(), 0, "pulled items must be settled back");
    assert_eq!(*stats.pending(), 1, "the item waits for another attempt");
    assert_eq!(*stats.failed(), 0, "aborts are not the item's failures");

    // Once credits are back the item processes normally.
    mock.set_credits_remaining(10);
    let result = client
        .process_queue_batch(Some(1), None)
        .await
        .expect("batch should succeed once credits allow");
    assert_eq!(*result.succeeded(), 1);
}
