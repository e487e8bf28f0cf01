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

//! Shared test fixtures.
//!
//! Each test gets its own uniquely-named shared-cache in-memory SQLite
//! database with migrations applied. The database lives as long as its
//! connection pool holds a connection, so cloned `Database` handles within
//! a test all see the same data while tests stay isolated from each other.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use claimq::Database;

static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Creates a fresh in-memory SQLite database with migrations applied.
pub async fn sqlite_database() -> Database {
    let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let url = format!("file:claimq_test_{}?mode=memory&cache=shared", n);
    let database = Database::new(&url, 5);
    database
        .run_migrations()
        .await
        .expect("Failed to run migrations");
    database
}

/// Polls `check` until it returns true or `deadline` elapses.
///
/// Used by consumer end-to-end tests to wait for background workers
/// without hard-coding sleeps.
pub async fn eventually<F, Fut>(deadline: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    loop {
        if check().await {
            return true;
        }
        if start.elapsed() > deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
