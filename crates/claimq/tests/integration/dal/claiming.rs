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

//! Concurrency tests for the atomic claim protocol.
//!
//! These tests verify that the conditional-UPDATE claim prevents race
//! conditions where multiple consumers might claim the same entry
//! simultaneously, and that leases protect and release entries correctly.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::Barrier;

use claimq::dal::DAL;
use claimq::{CompleteBehavior, NewQueueEntry, ProcessingState};

use crate::fixtures::sqlite_database;

#[tokio::test]
async fn test_claim_flips_state_and_sets_lease() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("billing-events", "{}", "producer-1"))
        .await
        .expect("Failed to insert entry");

    assert_eq!(entry.processing_state, ProcessingState::Available);
    assert!(entry.processing_owner.is_none());

    let now = Utc::now();
    let lease_deadline = now + ChronoDuration::seconds(30);
    let claimed = dal
        .entry()
        .claim(entry.id, "node-1", lease_deadline, now)
        .await
        .expect("Claim attempt failed")
        .expect("Claim should succeed on an available entry");

    assert_eq!(claimed.processing_state, ProcessingState::InProcessing);
    assert_eq!(claimed.processing_owner.as_deref(), Some("node-1"));
    assert_eq!(
        claimed.next_available_at.timestamp_micros(),
        lease_deadline.timestamp_micros()
    );

    // The lease is held: a second claimant inside the lease window loses.
    let lost = dal
        .entry()
        .claim(entry.id, "node-2", now + ChronoDuration::seconds(60), now)
        .await
        .expect("Claim attempt failed");
    assert!(lost.is_none(), "Claim inside a held lease must fail");
}

/// Given N concurrent claim attempts on the same id at the same instant,
/// exactly one returns success.
#[tokio::test]
async fn test_concurrent_claimants_exactly_one_wins() {
    let database = sqlite_database().await;
    let dal = DAL::new(database.clone());

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("billing-events", "{}", "producer-1"))
        .await
        .expect("Failed to insert entry");

    const NUM_CLAIMANTS: usize = 8;
    let barrier = Arc::new(Barrier::new(NUM_CLAIMANTS));
    let now = Utc::now();
    let mut handles = Vec::new();

    for claimant in 0..NUM_CLAIMANTS {
        let db_clone = database.clone();
        let barrier_clone = barrier.clone();
        let entry_id = entry.id;

        handles.push(tokio::spawn(async move {
            let dal = DAL::new(db_clone);
            let owner = format!("node-{}", claimant);

            // Line up all claimants before racing for the entry
            barrier_clone.wait().await;

            dal.entry()
                .claim(entry_id, &owner, now + ChronoDuration::seconds(30), now)
                .await
                .expect("Claim attempt failed")
                .is_some()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.expect("Claimant task panicked") {
            wins += 1;
        }
    }

    assert_eq!(
        wins, 1,
        "Exactly one of {} concurrent claimants must win",
        NUM_CLAIMANTS
    );
}

#[tokio::test]
async fn test_lease_expiry_allows_reclaim() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("billing-events", "{}", "producer-1"))
        .await
        .expect("Failed to insert entry");

    // node-1 claims with a 30s lease, then "crashes" without clearing.
    let t0 = Utc::now();
    let lease = t0 + ChronoDuration::seconds(30);
    dal.entry()
        .claim(entry.id, "node-1", lease, t0)
        .await
        .expect("Claim attempt failed")
        .expect("Initial claim should succeed");

    // At t0+31s the lease has lapsed; node-2's claim wins and ownership flips.
    let t1 = t0 + ChronoDuration::seconds(31);
    let reclaimed = dal
        .entry()
        .claim(entry.id, "node-2", t1 + ChronoDuration::seconds(30), t1)
        .await
        .expect("Claim attempt failed")
        .expect("Claim after lease expiry should succeed");

    assert_eq!(reclaimed.processing_owner.as_deref(), Some("node-2"));
    assert_eq!(reclaimed.processing_state, ProcessingState::InProcessing);
}

#[tokio::test]
async fn test_claim_history_appended_once_per_successful_claim() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("billing-events", "{}", "producer-1"))
        .await
        .expect("Failed to insert entry");

    let t0 = Utc::now();
    dal.entry()
        .claim(entry.id, "node-1", t0 + ChronoDuration::seconds(30), t0)
        .await
        .unwrap()
        .expect("First claim should succeed");
    dal.claim_history()
        .record_claim(entry.id, "node-1", t0)
        .await
        .expect("Failed to record claim");

    // Failed claims leave no history behind.
    let lost = dal
        .entry()
        .claim(entry.id, "node-2", t0 + ChronoDuration::seconds(60), t0)
        .await
        .unwrap();
    assert!(lost.is_none());

    let t1 = t0 + ChronoDuration::seconds(31);
    dal.entry()
        .claim(entry.id, "node-2", t1 + ChronoDuration::seconds(30), t1)
        .await
        .unwrap()
        .expect("Reclaim should succeed");
    dal.claim_history()
        .record_claim(entry.id, "node-2", t1)
        .await
        .expect("Failed to record claim");

    let history = dal
        .claim_history()
        .history_for_entry(entry.id)
        .await
        .expect("Failed to load claim history");

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].owner_id, "node-1");
    assert_eq!(history[1].owner_id, "node-2");
    assert!(history[0].claimed_at <= history[1].claimed_at);
}

#[tokio::test]
async fn test_terminal_entries_never_claimable() {
    let database = sqlite_database().await;
    let dal = DAL::new(database);

    let entry = dal
        .entry()
        .insert(NewQueueEntry::new("billing-events", "{}", "producer-1"))
        .await
        .expect("Failed to insert entry");

    let t0 = Utc::now();
    dal.entry()
        .claim(entry.id, "node-1", t0 + ChronoDuration::seconds(30), t0)
        .await
        .unwrap()
        .expect("Claim should succeed");
    let cleared = dal
        .entry()
        .clear(entry.id, "node-1", CompleteBehavior::MarkProcessed)
        .await
        .expect("Clear failed");
    assert!(cleared);

    // Even far in the future, a Processed entry is not eligible.
    let far_future = t0 + ChronoDuration::days(365);
    let attempt = dal
        .entry()
        .claim(
            entry.id,
            "node-2",
            far_future + ChronoDuration::seconds(30),
            far_future,
        )
        .await
        .expect("Claim attempt failed");
    assert!(attempt.is_none(), "Terminal entries must never be reclaimed");
}
