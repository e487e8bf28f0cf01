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

//! Queue Entry Model
//!
//! This module defines the durable unit of work and its lifecycle state
//! machine. The eligibility check here is the single source of truth for
//! "can this entry be claimed right now"; the DAL's fetch and claim
//! statements restate the same predicate in SQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Lifecycle state of a queue entry.
///
/// Stored as TEXT in the database. Entries configured for hard delete on
/// completion never reach `Processed`; their row is removed instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessingState {
    /// Unclaimed; claimable once `next_available_at` has passed
    Available,
    /// Claimed; `next_available_at` is the lease expiry
    InProcessing,
    /// Terminal; never claimed or mutated again
    Processed,
}

impl ProcessingState {
    /// String form stored in the `processing_state` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Available => "Available",
            ProcessingState::InProcessing => "InProcessing",
            ProcessingState::Processed => "Processed",
        }
    }

    /// Parses the stored TEXT form back into a state.
    pub fn parse(s: &str) -> Result<Self, QueueError> {
        match s {
            "Available" => Ok(ProcessingState::Available),
            "InProcessing" => Ok(ProcessingState::InProcessing),
            "Processed" => Ok(ProcessingState::Processed),
            other => Err(QueueError::UnknownState(other.to_string())),
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure eligibility check: may an entry in `state` be claimed at `now`?
///
/// - `Available` entries are eligible.
/// - `InProcessing` entries are eligible only once their lease
///   (`next_available_at`) has expired; this is the crash-recovery path,
///   where the previous owner is presumed dead.
/// - `Processed` entries are never eligible.
///
/// No side effects. Callers that want to respect scheduled (delayed) work
/// must additionally require `next_available_at <= now` for `Available`
/// entries, as `fetch_eligible` does.
pub fn is_eligible(state: ProcessingState, next_available_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match state {
        ProcessingState::Available => true,
        ProcessingState::InProcessing => next_available_at <= now,
        ProcessingState::Processed => false,
    }
}

/// Represents a durable work item in the queue.
///
/// This struct maps to the `queue_entries` table. The payload is an opaque
/// serialized value owned by the queue's producer/consumer pair; the queue
/// core never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Store-assigned identifier, unique and monotonically increasing at
    /// insert time; used as the ordering tiebreak
    pub id: i64,
    /// Name of the queue this entry belongs to; selects the handler
    pub queue_name: String,
    /// Opaque serialized payload, never inspected by the core
    pub payload: String,
    /// Identity of the producer that inserted the entry (diagnostics only)
    pub creating_owner: String,
    /// Identity of the current lease holder; `None` when unclaimed
    pub processing_owner: Option<String>,
    /// Current lifecycle state
    pub processing_state: ProcessingState,
    /// Lease expiry while `InProcessing`; earliest eligibility while
    /// `Available` (supports delayed/scheduled work)
    pub next_available_at: DateTime<Utc>,
    /// Number of completed reschedules (retry counter)
    pub attempts: i32,
    /// Account partition key for scoped lookups
    pub account_scope_id: Option<String>,
    /// Tenant partition key for scoped lookups
    pub tenant_scope_id: Option<String>,
    /// Timestamp when the entry was inserted
    pub created_at: DateTime<Utc>,
}

impl QueueEntry {
    /// Whether this entry may be claimed at `now`. See [`is_eligible`].
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        is_eligible(self.processing_state, self.next_available_at, now)
    }

    /// Deserializes the payload into a typed value.
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, QueueError> {
        Ok(serde_json::from_str(&self.payload)?)
    }

    /// A truncated payload rendering for operator logs.
    pub fn payload_summary(&self) -> String {
        const MAX: usize = 120;
        if self.payload.len() <= MAX {
            self.payload.clone()
        } else {
            let cut = self
                .payload
                .char_indices()
                .take_while(|(i, _)| *i < MAX)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            format!("{}...", &self.payload[..cut])
        }
    }
}

/// Represents a new queue entry to be inserted into the store.
///
/// The store assigns the id and sets the state to `Available`. Entries are
/// effective immediately unless `effective_at` is set.
#[derive(Debug, Clone)]
pub struct NewQueueEntry {
    /// Name of the queue the entry belongs to
    pub queue_name: String,
    /// Opaque serialized payload
    pub payload: String,
    /// Identity of the producer
    pub creating_owner: String,
    /// Earliest time the entry becomes claimable; `None` means now
    pub effective_at: Option<DateTime<Utc>>,
    /// Account partition key
    pub account_scope_id: Option<String>,
    /// Tenant partition key
    pub tenant_scope_id: Option<String>,
}

impl NewQueueEntry {
    /// Creates an entry effective immediately, with no scope keys.
    pub fn new(
        queue_name: impl Into<String>,
        payload: impl Into<String>,
        creating_owner: impl Into<String>,
    ) -> Self {
        Self {
            queue_name: queue_name.into(),
            payload: payload.into(),
            creating_owner: creating_owner.into(),
            effective_at: None,
            account_scope_id: None,
            tenant_scope_id: None,
        }
    }

    /// Schedules the entry to become claimable at a future time.
    pub fn effective_at(mut self, at: DateTime<Utc>) -> Self {
        self.effective_at = Some(at);
        self
    }

    /// Sets the account partition key.
    pub fn account_scope(mut self, account_scope_id: impl Into<String>) -> Self {
        self.account_scope_id = Some(account_scope_id.into());
        self
    }

    /// Sets the tenant partition key.
    pub fn tenant_scope(mut self, tenant_scope_id: impl Into<String>) -> Self {
        self.tenant_scope_id = Some(tenant_scope_id.into());
        self
    }
}

/// Tenant/account filter applied to fetch and operational queries.
///
/// An empty filter matches all entries. When a key is set, only entries
/// carrying that exact scope value match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeFilter {
    pub account_scope_id: Option<String>,
    pub tenant_scope_id: Option<String>,
}

impl ScopeFilter {
    /// Matches all entries regardless of scope.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches entries for a single account.
    pub fn account(account_scope_id: impl Into<String>) -> Self {
        Self {
            account_scope_id: Some(account_scope_id.into()),
            tenant_scope_id: None,
        }
    }

    /// Matches entries for a single tenant.
    pub fn tenant(tenant_scope_id: impl Into<String>) -> Self {
        Self {
            account_scope_id: None,
            tenant_scope_id: Some(tenant_scope_id.into()),
        }
    }

    /// Whether this filter constrains anything.
    pub fn is_unscoped(&self) -> bool {
        self.account_scope_id.is_none() && self.tenant_scope_id.is_none()
    }
}
