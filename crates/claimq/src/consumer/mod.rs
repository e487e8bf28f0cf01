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

//! Queue Consumer Module
//!
//! One `QueueConsumer` drives one queue within one process. It is
//! responsible for:
//! - Polling the store for eligible entries at a fixed cadence
//! - Attempting the atomic claim on each candidate
//! - Handing claimed entries to a bounded worker pool
//! - Finalizing handler outcomes through the retry controller
//!
//! Many consumer processes may run concurrently against the same store;
//! the store's atomic claim is the only cross-process exclusion. A lost
//! claim race is an expected outcome, not an error.
//!
//! The worker pool bounds in-flight claims per process and provides
//! natural back-pressure: when workers are saturated the poll loop claims
//! nothing on that tick, and unclaimed eligible entries remain visible to
//! other processes. Handlers that overrun their timeout are abandoned;
//! the entry's lease eventually expires and any consumer may reclaim it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Notify, Semaphore};
use tokio::time;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{CompleteBehavior, QueueConfig};
use crate::dal::DAL;
use crate::error::HandlerError;
use crate::handler::QueueHandler;
use crate::models::entry::QueueEntry;
use crate::retry::{BackoffSchedule, RetryDecision};

/// Per-process consumer loop for a single queue.
///
/// The consumer maintains its own instance id, used as the claim owner
/// identity and recorded in the claim history for every claim it wins.
pub struct QueueConsumer {
    /// Data access layer for store operations
    dal: DAL,
    /// Per-queue configuration (cadence, lease, backoff, pool bound)
    config: QueueConfig,
    /// The single handler registered for this queue
    handler: Arc<dyn QueueHandler>,
    /// Owner identity written into claims and guarded writes
    owner_id: String,
    /// Bounds concurrently executing handlers
    semaphore: Arc<Semaphore>,
    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
    /// Wakes the loop so shutdown is observed promptly
    notify: Arc<Notify>,
}

impl QueueConsumer {
    /// Creates a consumer for one queue with a fresh instance identity.
    pub fn new(dal: DAL, config: QueueConfig, handler: Arc<dyn QueueHandler>) -> Self {
        let instance_id = Uuid::new_v4();
        let max_in_flight = config.max_in_flight();
        Self {
            dal,
            config,
            handler,
            owner_id: instance_id.to_string(),
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            shutdown: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// The identity this consumer claims entries under.
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Runs the poll loop until [`shutdown`](Self::shutdown) is called,
    /// then waits for in-flight workers to finish.
    pub async fn run(&self) {
        info!(
            queue_name = %self.config.queue_name(),
            owner_id = %self.owner_id,
            "Starting queue consumer"
        );

        let mut interval = time::interval(self.config.poll_interval());

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.notify.notified() => {}
            }

            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            self.poll_once().await;
        }

        // Drain: every worker holds a permit until it finishes, so
        // acquiring the full pool means nothing is still in flight.
        let _drain = self
            .semaphore
            .acquire_many(self.config.max_in_flight() as u32)
            .await;

        info!(
            queue_name = %self.config.queue_name(),
            owner_id = %self.owner_id,
            "Queue consumer stopped"
        );
    }

    /// Signals the poll loop to stop. `run` returns once in-flight
    /// workers have drained.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// One poll tick: fetch a bounded batch of eligible entries and try to
    /// claim each. Transient store errors are logged and the tick ends;
    /// the loop continues at the next tick with no entry state changed.
    async fn poll_once(&self) {
        if self.semaphore.available_permits() == 0 {
            debug!(
                queue_name = %self.config.queue_name(),
                "All worker slots busy, skipping poll"
            );
            return;
        }

        // Never fetch more than we could execute right now.
        let limit = self
            .config
            .batch_size()
            .min(self.semaphore.available_permits()) as i64;

        let now = Utc::now();
        let candidates = match self
            .dal
            .entry()
            .fetch_eligible(self.config.queue_name(), self.config.scope(), now, limit)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    queue_name = %self.config.queue_name(),
                    error = %e,
                    "Store error during poll tick, will retry next tick"
                );
                return;
            }
        };

        for candidate in candidates {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            // Take the worker slot before claiming so a claim never waits
            // on a saturated pool while its lease burns down.
            let permit = match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => return,
            };

            let now = Utc::now();
            let lease_deadline = now
                + chrono::Duration::from_std(self.config.lease_duration())
                    .unwrap_or_else(|_| chrono::Duration::max_value());

            match self
                .dal
                .entry()
                .claim(candidate.id, &self.owner_id, lease_deadline, now)
                .await
            {
                Ok(Some(claimed)) => {
                    if let Err(e) = self
                        .dal
                        .claim_history()
                        .record_claim(claimed.id, &self.owner_id, now)
                        .await
                    {
                        warn!(entry_id = claimed.id, error = %e, "Failed to append claim history");
                    }
                    self.spawn_worker(permit, claimed);
                }
                Ok(None) => {
                    // Lost the race to another consumer; expected under
                    // contention.
                    debug!(
                        queue_name = %self.config.queue_name(),
                        entry_id = candidate.id,
                        "Lost claim race, skipping"
                    );
                }
                Err(e) => {
                    warn!(
                        queue_name = %self.config.queue_name(),
                        entry_id = candidate.id,
                        error = %e,
                        "Store error during claim attempt"
                    );
                }
            }
        }
    }

    /// Runs the handler on the worker pool without blocking the poll loop.
    ///
    /// The permit is held for the worker's lifetime. On timeout the worker
    /// is abandoned: its outcome is dropped, no finalization happens, and
    /// the entry becomes reclaimable once its lease expires. This is why
    /// handlers must be idempotent.
    fn spawn_worker(&self, permit: tokio::sync::OwnedSemaphorePermit, entry: QueueEntry) {
        let dal = self.dal.clone();
        let handler = Arc::clone(&self.handler);
        let owner_id = self.owner_id.clone();
        let schedule = self.config.backoff_schedule().clone();
        let on_complete = self.config.on_complete();
        let handler_timeout = self.config.handler_timeout();

        tokio::spawn(async move {
            let _permit = permit; // Hold the worker slot until done

            match time::timeout(handler_timeout, handler.handle(&entry)).await {
                Ok(outcome) => {
                    finalize_outcome(&dal, &owner_id, &schedule, on_complete, entry, outcome).await;
                }
                Err(_) => {
                    warn!(
                        entry_id = entry.id,
                        queue_name = %entry.queue_name,
                        "Handler timed out, abandoning worker; entry becomes reclaimable at lease expiry"
                    );
                }
            }
        });
    }
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("queue_name", &self.config.queue_name())
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

/// Applies the retry controller's decision to a completed handler outcome.
///
/// All guarded writes tolerate a stale owner: a consumer whose lease
/// expired mid-flight logs the supersession and moves on without touching
/// the newer claimant's state.
async fn finalize_outcome(
    dal: &DAL,
    owner_id: &str,
    schedule: &BackoffSchedule,
    on_complete: CompleteBehavior,
    entry: QueueEntry,
    outcome: Result<(), HandlerError>,
) {
    match outcome {
        Ok(()) => match dal.entry().clear(entry.id, owner_id, on_complete).await {
            Ok(true) => {
                debug!(entry_id = entry.id, queue_name = %entry.queue_name, "Entry cleared");
            }
            Ok(false) => {
                warn!(
                    entry_id = entry.id,
                    "Stale owner on clear: lease expired and entry was superseded"
                );
            }
            Err(e) => {
                warn!(entry_id = entry.id, error = %e, "Store error during clear");
            }
        },
        Err(HandlerError::Retryable(cause)) => {
            match RetryDecision::decide(schedule, entry.attempts, Utc::now()) {
                RetryDecision::Reschedule { at } => {
                    match dal.entry().reschedule(entry.id, owner_id, at).await {
                        Ok(true) => {
                            info!(
                                entry_id = entry.id,
                                queue_name = %entry.queue_name,
                                retry_at = %at,
                                attempt = entry.attempts + 1,
                                error = %cause,
                                "Rescheduled after retryable failure"
                            );
                        }
                        Ok(false) => {
                            warn!(
                                entry_id = entry.id,
                                "Stale owner on reschedule: lease expired and entry was superseded"
                            );
                        }
                        Err(e) => {
                            warn!(entry_id = entry.id, error = %e, "Store error during reschedule");
                        }
                    }
                }
                RetryDecision::GiveUp { attempts_made } => {
                    error!(
                        entry_id = entry.id,
                        queue_name = %entry.queue_name,
                        payload = %entry.payload_summary(),
                        error = %cause,
                        "Gave up after exhausting {} scheduled retries",
                        attempts_made
                    );
                    if let Err(e) = dal.entry().remove(entry.id).await {
                        warn!(entry_id = entry.id, error = %e, "Store error during give-up removal");
                    }
                }
            }
        }
        Err(HandlerError::Fatal(cause)) => {
            error!(
                entry_id = entry.id,
                queue_name = %entry.queue_name,
                payload = %entry.payload_summary(),
                error = %cause,
                "Fatal handler failure, giving up"
            );
            if let Err(e) = dal.entry().remove(entry.id).await {
                warn!(entry_id = entry.id, error = %e, "Store error during give-up removal");
            }
        }
    }
}
