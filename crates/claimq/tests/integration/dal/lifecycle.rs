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

//! Entry lifecycle tests: insert defaults, eligibility ordering, delayed
//! work, owner-guarded finalization and completion behaviors.

use chrono::{Duration as ChronoDuration, Utc};

use claimq::dal::DAL;
use claimq::{CompleteBehavior, Database, NewQueueEntry, ProcessingState, ScopeFilter};

use crate::fixtures::sqlite_database;

#[tokio::test]
async fn test_insert_defaults_and_monotonic_ids() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let first = dal
        .entry()
        .insert(NewQueueEntry::new(
            "overdue-refresh",
            r#"{"account":"a-1"}"#,
            "api-server-1",
        ))
        .await
        .expect("Failed to insert entry");

    assert_eq!(first.processing_state, ProcessingState::Available);
    assert_eq!(first.attempts, 0);
    assert!(first.processing_owner.is_none());
    assert_eq!(first.creating_owner, "api-server-1");
    assert_eq!(first.payload, r#"{"account":"a-1"}"#);

    let second = dal
        .entry()
        .insert(NewQueueEntry::new("overdue-refresh", "{}", "api-server-1"))
        .await
        .expect("Failed to insert entry");

    assert!(second.id > first.id, "Ids must be monotonically increasing");
}

#[tokio::test]
async fn test_fetch_eligible_orders_by_time_then_id() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let base = Utc::now();
    let later = dal
        .entry()
        .insert(
            NewQueueEntry::new("overdue-refresh", r#"{"n":2}"#, "p")
                .effective_at(base + ChronoDuration::seconds(10)),
        )
        .await
        .unwrap();
    let earlier = dal
        .entry()
        .insert(
            NewQueueEntry::new("overdue-refresh", r#"{"n":1}"#, "p")
                .effective_at(base + ChronoDuration::seconds(5)),
        )
        .await
        .unwrap();
    // Same effective time as `later`: the lower id breaks the tie.
    let tied = dal
        .entry()
        .insert(
            NewQueueEntry::new("overdue-refresh", r#"{"n":3}"#, "p")
                .effective_at(base + ChronoDuration::seconds(10)),
        )
        .await
        .unwrap();

    let now = base + ChronoDuration::seconds(60);
    let eligible = dal
        .entry()
        .fetch_eligible("overdue-refresh", &ScopeFilter::all(), now, 10)
        .await
        .expect("Fetch failed");

    let ids: Vec<i64> = eligible.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![earlier.id, later.id, tied.id]);

    // The limit bounds the batch from the front of the ordering.
    let bounded = dal
        .entry()
        .fetch_eligible("overdue-refresh", &ScopeFilter::all(), now, 2)
        .await
        .expect("Fetch failed");
    assert_eq!(bounded.len(), 2);
    assert_eq!(bounded[0].id, earlier.id);
}

#[tokio::test]
async fn test_future_dated_entries_not_fetched() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let now = Utc::now();
    dal.entry()
        .insert(
            NewQueueEntry::new("payment-retry", "{}", "p")
                .effective_at(now + ChronoDuration::hours(1)),
        )
        .await
        .unwrap();

    let eligible = dal
        .entry()
        .fetch_eligible("payment-retry", &ScopeFilter::all(), now, 10)
        .await
        .expect("Fetch failed");
    assert!(eligible.is_empty(), "Delayed work must stay invisible until due");

    let eligible = dal
        .entry()
        .fetch_eligible(
            "payment-retry",
            &ScopeFilter::all(),
            now + ChronoDuration::hours(2),
            10,
        )
        .await
        .expect("Fetch failed");
    assert_eq!(eligible.len(), 1);
}

#[tokio::test]
async fn test_clear_delete_removes_row() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("bus-events", "{}", "p"))
        .await
        .unwrap();

    let now = Utc::now();
    dal.entry()
        .claim(entry.id, "node-1", now + ChronoDuration::seconds(30), now)
        .await
        .unwrap()
        .expect("Claim should succeed");

    let cleared = dal
        .entry()
        .clear(entry.id, "node-1", CompleteBehavior::Delete)
        .await
        .expect("Clear failed");
    assert!(cleared);

    assert!(dal.entry().get_by_id(entry.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_clear_mark_processed_keeps_terminal_row() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("payment-retry", "{}", "p"))
        .await
        .unwrap();

    let now = Utc::now();
    dal.entry()
        .claim(entry.id, "node-1", now + ChronoDuration::seconds(30), now)
        .await
        .unwrap()
        .expect("Claim should succeed");

    let cleared = dal
        .entry()
        .clear(entry.id, "node-1", CompleteBehavior::MarkProcessed)
        .await
        .expect("Clear failed");
    assert!(cleared);

    let stored = dal
        .entry()
        .get_by_id(entry.id)
        .await
        .unwrap()
        .expect("Processed entry should remain inspectable");
    assert_eq!(stored.processing_state, ProcessingState::Processed);
    // The completing owner stays on the record.
    assert_eq!(stored.processing_owner.as_deref(), Some("node-1"));
}

#[tokio::test]
async fn test_reschedule_returns_entry_to_available() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("payment-retry", "{}", "p"))
        .await
        .unwrap();

    let now = Utc::now();
    dal.entry()
        .claim(entry.id, "node-1", now + ChronoDuration::seconds(30), now)
        .await
        .unwrap()
        .expect("Claim should succeed");

    let retry_at = now + ChronoDuration::hours(1);
    let rescheduled = dal
        .entry()
        .reschedule(entry.id, "node-1", retry_at)
        .await
        .expect("Reschedule failed");
    assert!(rescheduled);

    let stored = dal.entry().get_by_id(entry.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_state, ProcessingState::Available);
    assert!(stored.processing_owner.is_none());
    assert_eq!(stored.attempts, 1);
    assert_eq!(
        stored.next_available_at.timestamp_micros(),
        retry_at.timestamp_micros()
    );
}

/// A process whose lease expired must not be able to finalize an entry
/// that has since been claimed by someone else.
#[tokio::test]
async fn test_stale_owner_writes_fail_harmlessly() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("payment-retry", "{}", "p"))
        .await
        .unwrap();

    // node-1 claims, its lease lapses, node-2 reclaims.
    let t0 = Utc::now();
    dal.entry()
        .claim(entry.id, "node-1", t0 + ChronoDuration::seconds(30), t0)
        .await
        .unwrap()
        .expect("Initial claim should succeed");

    let t1 = t0 + ChronoDuration::seconds(31);
    let lease2 = t1 + ChronoDuration::seconds(30);
    dal.entry()
        .claim(entry.id, "node-2", lease2, t1)
        .await
        .unwrap()
        .expect("Reclaim should succeed");

    // node-1 wakes up late and tries to finalize: both guarded writes
    // fail and the superseding claim is untouched.
    let cleared = dal
        .entry()
        .clear(entry.id, "node-1", CompleteBehavior::Delete)
        .await
        .expect("Clear call failed");
    assert!(!cleared);

    let rescheduled = dal
        .entry()
        .reschedule(entry.id, "node-1", t1 + ChronoDuration::hours(1))
        .await
        .expect("Reschedule call failed");
    assert!(!rescheduled);

    let stored = dal.entry().get_by_id(entry.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_state, ProcessingState::InProcessing);
    assert_eq!(stored.processing_owner.as_deref(), Some("node-2"));
    assert_eq!(
        stored.next_available_at.timestamp_micros(),
        lease2.timestamp_micros()
    );
    assert_eq!(stored.attempts, 0);
}

#[tokio::test]
async fn test_remove_hard_deletes_without_owner_check() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("bus-events", "{}", "p"))
        .await
        .unwrap();

    assert!(dal.entry().remove(entry.id).await.expect("Remove failed"));
    assert!(dal.entry().get_by_id(entry.id).await.unwrap().is_none());
    // Removing again reports nothing was there.
    assert!(!dal.entry().remove(entry.id).await.expect("Remove failed"));
}

#[tokio::test]
async fn test_entries_survive_reopening_file_database() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("claimq.db");
    let url = path.to_str().expect("Non-UTF8 temp path").to_string();

    let entry_id = {
        let database = Database::new(&url, 5);
        database.run_migrations().await.expect("Migrations failed");
        let dal = DAL::new(database);
        dal.entry()
            .insert(NewQueueEntry::new("overdue-refresh", "{}", "p"))
            .await
            .unwrap()
            .id
    };

    // A second process opening the same file sees the durable entry.
    let database = Database::new(&url, 5);
    database.run_migrations().await.expect("Migrations failed");
    let dal = DAL::new(database);
    let stored = dal
        .entry()
        .get_by_id(entry_id)
        .await
        .unwrap()
        .expect("Entry must survive reopen");
    assert_eq!(stored.processing_state, ProcessingState::Available);
}
