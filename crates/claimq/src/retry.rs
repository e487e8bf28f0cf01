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

//! Retry / backoff controller.
//!
//! A queue's backoff schedule is an ordered, finite list of delays. The Kth
//! reschedule lands at failure time + `schedule[K]`; once the schedule is
//! exhausted the entry is given up. The decision itself is a pure function
//! so it can be unit-tested without a store.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Ordered, finite list of delays applied on successive retryable failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    /// Creates a schedule from the given delays, applied in order.
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// A schedule with no retries: the first retryable failure gives up.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    /// The configured delays in application order.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Number of retries before giving up.
    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }
}

impl From<Vec<Duration>> for BackoffSchedule {
    fn from(delays: Vec<Duration>) -> Self {
        Self::new(delays)
    }
}

/// Outcome of the retry decision for one retryable failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reschedule the entry to become available again at this time
    Reschedule { at: DateTime<Utc> },
    /// The schedule is exhausted; finalize the entry as given up
    GiveUp { attempts_made: i32 },
}

impl RetryDecision {
    /// Decides the fate of an entry that just failed retryably at `now`.
    ///
    /// `attempts` is the number of reschedules already completed. If the
    /// schedule still has a delay for this attempt index, the entry is
    /// rescheduled to `now + schedule[attempts]`; otherwise it is given up.
    ///
    /// Fatal failures never reach this function; they give up immediately
    /// regardless of any delays left in the schedule.
    pub fn decide(schedule: &BackoffSchedule, attempts: i32, now: DateTime<Utc>) -> Self {
        let index = attempts.max(0) as usize;
        match schedule.delays().get(index) {
            Some(delay) => {
                // chrono can represent any Duration this side of the heat
                // death; out-of-range only happens with absurd configs.
                let delay = chrono::Duration::from_std(*delay)
                    .unwrap_or_else(|_| chrono::Duration::max_value());
                RetryDecision::Reschedule { at: now + delay }
            }
            None => RetryDecision::GiveUp {
                attempts_made: attempts,
            },
        }
    }
}
