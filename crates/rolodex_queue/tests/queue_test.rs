//! Tests for priority ordering, retry bookkeeping, and daily slots.

use rolodex_queue::{BatchQueue, Priority};
use std::collections::HashMap;
use uuid::Uuid;

fn meta() -> HashMap<String, serde_json::Value> {
    HashMap::new()
}

#[test]
fn dequeue_order_is_strict_across_tiers() {
    let mut queue = BatchQueue::new(100, 3);
    queue.enqueue("normal-1", Priority::Normal, meta());
    queue.enqueue("urgent-1", Priority::Urgent, meta());
    queue.enqueue("normal-2", Priority::Normal, meta());
    queue.enqueue("high-1", Priority::High, meta());

    let batch = queue.next_batch(None);
    let order: Vec<&str> = batch.iter().map(|item| item.subject_id().as_str()).collect();
    assert_eq!(order, vec!["urgent-1", "high-1", "normal-1", "normal-2"]);
}

#[test]
fn dequeue_order_is_fifo_within_a_tier() {
    let mut queue = BatchQueue::new(100, 3);
    for subject in ["u-1", "u-2", "u-3"] {
        queue.enqueue(subject, Priority::Urgent, meta());
    }
    let batch = queue.next_batch(None);
    let order: Vec<&str> = batch.iter().map(|item| item.subject_id().as_str()).collect();
    assert_eq!(order, vec!["u-1", "u-2", "u-3"]);
}

#[test]
fn next_batch_is_bounded_by_remaining_daily_slots() {
    let mut queue = BatchQueue::new(2, 3);
    let ids = queue.enqueue_many(["a", "b", "c", "d", "e"], Priority::Normal, meta());
    assert_eq!(ids.len(), 5);

    let batch = queue.next_batch(None);
    assert_eq!(batch.len(), 2, "only two daily slots remain");

    for item in &batch {
        queue.mark_done(*item.id(), true);
    }

    let stats = queue.stats();
    assert_eq!(*stats.daily_processed(), 2);
    assert_eq!(*stats.daily_remaining(), 0);
    assert_eq!(*stats.pending(), 3);

    assert!(
        queue.next_batch(None).is_empty(),
        "an exhausted daily quota yields an empty batch, not an error"
    );
    assert!(queue.has_pending());
}

#[test]
fn only_successes_count_against_the_daily_quota() {
    let mut queue = BatchQueue::new(10, 3);
    queue.enqueue("ok", Priority::Normal, meta());
    queue.enqueue("bad", Priority::Normal, meta());

    let batch = queue.next_batch(None);
    queue.mark_done(*batch[0].id(), true);
    queue.mark_done(*batch[1].id(), false);

    let stats = queue.stats();
    assert_eq!(*stats.daily_processed(), 1);
    assert_eq!(*stats.pending(), 1, "the failure went back to pending");
}

#[test]
fn failures_reenqueue_until_the_retry_ceiling() {
    let mut queue = BatchQueue::new(100, 2);
    let id = queue.enqueue("flaky", Priority::Normal, meta());

    // First failure: one retry consumed, back to pending.
    let batch = queue.next_batch(None);
    assert_eq!(batch.len(), 1);
    queue.mark_done(id, false);
    assert!(queue.has_pending());
    assert!(queue.failed_item(&id).is_none());

    // Second failure hits the ceiling and fails permanently.
    let batch = queue.next_batch(None);
    assert_eq!(*batch[0].retry_count(), 1);
    queue.mark_done(id, false);

    let failed = queue.failed_item(&id).expect("item should be failed now");
    assert_eq!(*failed.retry_count(), 2);
    assert!(failed.retries_exhausted());
    assert!(!queue.has_pending());

    let stats = queue.stats();
    assert_eq!(*stats.failed(), 1);
    assert_eq!(*stats.daily_processed(), 0);
}

#[test]
fn restored_items_keep_their_retry_budget_and_priority() {
    let mut queue = BatchQueue::new(100, 1);
    let id = queue.enqueue("stranded", Priority::Urgent, meta());
    queue.enqueue("later", Priority::Normal, meta());

    let batch = queue.next_batch(Some(1));
    assert_eq!(*batch[0].id(), id);
    queue.restore(id);

    let stats = queue.stats();
    assert_eq!(*stats.in_flight(), 0);
    assert_eq!(*stats.pending(), 2);

    // Unlike a failure report, restoring spends no retries and keeps the
    // item ahead of lower tiers.
    let batch = queue.next_batch(None);
    assert_eq!(*batch[0].id(), id);
    assert_eq!(*batch[0].retry_count(), 0);
}

#[test]
fn restore_ignores_unknown_ids() {
    let mut queue = BatchQueue::new(100, 3);
    queue.enqueue("present", Priority::Normal, meta());
    queue.restore(Uuid::new_v4());
    assert_eq!(*queue.stats().pending(), 1);
}

#[test]
fn items_with_no_retry_budget_fail_on_dequeue() {
    let mut queue = BatchQueue::new(100, 0);
    let id = queue.enqueue("doomed", Priority::Normal, meta());

    let batch = queue.next_batch(None);
    assert!(batch.is_empty(), "a zero-retry item is never handed out");
    assert!(queue.failed_item(&id).is_some());
}

#[test]
fn mark_done_ignores_unknown_ids() {
    let mut queue = BatchQueue::new(100, 3);
    queue.enqueue("present", Priority::Normal, meta());
    queue.mark_done(Uuid::new_v4(), true);

    let stats = queue.stats();
    assert_eq!(*stats.pending(), 1);
    assert_eq!(*stats.completed(), 0);
    assert_eq!(*stats.daily_processed(), 0);
}

#[test]
fn clear_completed_reclaims_settled_items() {
    let mut queue = BatchQueue::new(100, 3);
    queue.enqueue_many(["a", "b", "c"], Priority::Normal, meta());
    for item in queue.next_batch(None) {
        queue.mark_done(*item.id(), true);
    }
    assert_eq!(*queue.stats().completed(), 3);

    assert_eq!(queue.clear_completed(), 3);
    assert_eq!(*queue.stats().completed(), 0);
    // Clearing does not touch the daily counter.
    assert_eq!(*queue.stats().daily_processed(), 3);
}

#[test]
fn metadata_rides_along_untouched() {
    let mut queue = BatchQueue::new(100, 3);
    let mut metadata = HashMap::new();
    metadata.insert("campaign".to_string(), serde_json::json!("q3-outreach"));
    queue.enqueue("subject", Priority::High, metadata);

    let batch = queue.next_batch(None);
    assert_eq!(
        batch[0].metadata().get("campaign"),
        Some(&serde_json::json!("q3-outreach"))
    );
}

#[test]
fn in_flight_items_are_tracked_until_settled() {
    let mut queue = BatchQueue::new(100, 3);
    queue.enqueue_many(["a", "b"], Priority::Normal, meta());

    let batch = queue.next_batch(Some(1));
    assert_eq!(batch.len(), 1);
    let stats = queue.stats();
    assert_eq!(*stats.in_flight(), 1);
    assert_eq!(*stats.pending(), 1);

    queue.mark_done(*batch[0].id(), true);
    assert_eq!(*queue.stats().in_flight(), 0);
}
