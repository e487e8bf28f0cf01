/*
 *  Copyright 2025-2026 Ledgerline Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! End-to-end consumer tests over an in-memory store: handler outcomes
//! drive the full clear / reschedule / give-up / lease-recovery paths.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serial_test::serial;
use tracing_test::traced_test;

use claimq::dal::DAL;
use claimq::{
    CompleteBehavior, HandlerError, NewQueueEntry, ProcessingState, QueueConfig, QueueEntry,
    QueueHandler, QueueService, ScopeFilter,
};

use crate::fixtures::{eventually, sqlite_database};

/// Succeeds after a configurable number of leading failures.
struct FlakyHandler {
    calls: Arc<AtomicUsize>,
    failures_before_success: usize,
    fatal: bool,
    /// First call sleeps this long (to trip the dispatcher timeout)
    first_call_delay: Option<Duration>,
}

impl FlakyHandler {
    fn succeeding(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            failures_before_success: 0,
            fatal: false,
            first_call_delay: None,
        }
    }

    fn failing_first(calls: Arc<AtomicUsize>, failures: usize) -> Self {
        Self {
            calls,
            failures_before_success: failures,
            fatal: false,
            first_call_delay: None,
        }
    }

    fn always_fatal(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            failures_before_success: usize::MAX,
            fatal: true,
            first_call_delay: None,
        }
    }

    fn always_retryable(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            failures_before_success: usize::MAX,
            fatal: false,
            first_call_delay: None,
        }
    }

    fn slow_first_call(calls: Arc<AtomicUsize>, delay: Duration) -> Self {
        Self {
            calls,
            failures_before_success: 0,
            fatal: false,
            first_call_delay: Some(delay),
        }
    }
}

#[async_trait]
impl QueueHandler for FlakyHandler {
    async fn handle(&self, _entry: &QueueEntry) -> Result<(), HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if call == 0 {
            if let Some(delay) = self.first_call_delay {
                tokio::time::sleep(delay).await;
            }
        }

        if call < self.failures_before_success {
            if self.fatal {
                return Err(HandlerError::fatal("unparseable payload"));
            }
            return Err(HandlerError::retryable("downstream unavailable"));
        }
        Ok(())
    }
}

fn fast_config(queue_name: &str) -> QueueConfig {
    QueueConfig::builder(queue_name)
        .poll_interval(Duration::from_millis(50))
        .lease_duration(Duration::from_secs(5))
        .backoff_schedule(vec![Duration::from_millis(100), Duration::from_millis(100)])
        .handler_timeout(Duration::from_secs(2))
        .build()
}

#[tokio::test]
#[serial]
async fn test_success_path_clears_entry() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut service = QueueService::new(database);
    service
        .register_queue(
            fast_config("billing-events"),
            Arc::new(FlakyHandler::succeeding(calls.clone())),
        )
        .unwrap();

    service
        .enqueue(
            NewQueueEntry::new("billing-events", r#"{"event":"renewal"}"#, "api-1")
                .tenant_scope("tenant-1"),
        )
        .await
        .unwrap();
    service.start().unwrap();

    let drained = eventually(Duration::from_secs(10), || {
        let dal = dal.clone();
        async move { dal.entry().count_pending("billing-events").await.unwrap() == 0 }
    })
    .await;
    assert!(drained, "Handled entry should be cleared from the queue");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The tenant sees nothing pending afterwards.
    let pending = dal
        .entry()
        .pending_for_scope("billing-events", &ScopeFilter::tenant("tenant-1"))
        .await
        .unwrap();
    assert!(pending.is_empty());

    service.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_retryable_failures_walk_schedule_then_succeed() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut service = QueueService::new(database);
    service
        .register_queue(
            fast_config("payment-retry"),
            // Fails twice, succeeds on the third delivery
            Arc::new(FlakyHandler::failing_first(calls.clone(), 2)),
        )
        .unwrap();

    service
        .enqueue(NewQueueEntry::new("payment-retry", "{}", "api-1"))
        .await
        .unwrap();
    service.start().unwrap();

    let drained = eventually(Duration::from_secs(10), || {
        let dal = dal.clone();
        async move { dal.entry().count_pending("payment-retry").await.unwrap() == 0 }
    })
    .await;
    assert!(drained, "Entry should clear after walking the backoff schedule");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    service.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_exhausted_schedule_gives_up() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut service = QueueService::new(database);
    service
        .register_queue(
            QueueConfig::builder("payment-retry")
                .poll_interval(Duration::from_millis(50))
                // No retries budgeted: first retryable failure gives up
                .backoff_schedule(claimq::BackoffSchedule::none())
                .build(),
            Arc::new(FlakyHandler::always_retryable(calls.clone())),
        )
        .unwrap();

    let entry = service
        .enqueue(NewQueueEntry::new("payment-retry", "{}", "api-1"))
        .await
        .unwrap();
    service.start().unwrap();

    let gone = eventually(Duration::from_secs(10), || {
        let dal = dal.clone();
        let id = entry.id;
        async move { dal.entry().get_by_id(id).await.unwrap().is_none() }
    })
    .await;
    assert!(gone, "Exhausted entry must be removed");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The audit trail outlives the removed entry.
    let history = dal.claim_history().history_for_entry(entry.id).await.unwrap();
    assert_eq!(history.len(), 1);

    service.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_fatal_failure_gives_up_immediately() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut service = QueueService::new(database);
    service
        .register_queue(
            // Plenty of schedule budget left; fatal must ignore it
            fast_config("bus-events"),
            Arc::new(FlakyHandler::always_fatal(calls.clone())),
        )
        .unwrap();

    let entry = service
        .enqueue(NewQueueEntry::new("bus-events", "{}", "api-1"))
        .await
        .unwrap();
    service.start().unwrap();

    let gone = eventually(Duration::from_secs(10), || {
        let dal = dal.clone();
        let id = entry.id;
        async move { dal.entry().get_by_id(id).await.unwrap().is_none() }
    })
    .await;
    assert!(gone, "Fatally failed entry must be removed");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    service.shutdown().await;
}

#[tokio::test]
#[traced_test]
#[serial]
async fn test_timed_out_worker_is_abandoned_and_entry_reclaimed() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut service = QueueService::new(database);
    service
        .register_queue(
            QueueConfig::builder("overdue-refresh")
                .poll_interval(Duration::from_millis(50))
                .lease_duration(Duration::from_millis(300))
                .handler_timeout(Duration::from_millis(100))
                .build(),
            // First delivery hangs past the timeout; redelivery succeeds
            Arc::new(FlakyHandler::slow_first_call(
                calls.clone(),
                Duration::from_secs(5),
            )),
        )
        .unwrap();

    let entry = service
        .enqueue(NewQueueEntry::new("overdue-refresh", "{}", "api-1"))
        .await
        .unwrap();
    service.start().unwrap();

    let drained = eventually(Duration::from_secs(10), || {
        let dal = dal.clone();
        async move { dal.entry().count_pending("overdue-refresh").await.unwrap() == 0 }
    })
    .await;
    assert!(
        drained,
        "Entry should be reclaimed after lease expiry and handled again"
    );
    assert!(
        calls.load(Ordering::SeqCst) >= 2,
        "Abandoned work must be redelivered"
    );
    assert!(logs_contain("Handler timed out"));

    // Each successful claim left an audit record.
    let history = dal.claim_history().history_for_entry(entry.id).await.unwrap();
    assert!(history.len() >= 2);

    service.shutdown().await;
}

#[tokio::test]
#[serial]
async fn test_mark_processed_keeps_terminal_record() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let mut service = QueueService::new(database);
    service
        .register_queue(
            QueueConfig::builder("notifications")
                .poll_interval(Duration::from_millis(50))
                .on_complete(CompleteBehavior::MarkProcessed)
                .build(),
            Arc::new(FlakyHandler::succeeding(calls.clone())),
        )
        .unwrap();

    let entry = service
        .enqueue_json("notifications", &serde_json::json!({"invoice": 42}), "api-1")
        .await
        .unwrap();
    service.start().unwrap();

    let processed = eventually(Duration::from_secs(10), || {
        let dal = dal.clone();
        let id = entry.id;
        async move {
            dal.entry()
                .get_by_id(id)
                .await
                .unwrap()
                .map(|e| e.processing_state == ProcessingState::Processed)
                .unwrap_or(false)
        }
    })
    .await;
    assert!(processed, "Entry should be retained with terminal state");

    service.shutdown().await;
}
