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

//! PostgreSQL-specific database models
//!
//! Diesel model definitions using native PostgreSQL types; timestamps are
//! `TIMESTAMPTZ` mapped to `DateTime<Utc>`. These models are used internally
//! by the PostgreSQL DAL paths and converted to/from domain types at the
//! DAL boundary.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::database::schema::postgres::{claim_history, queue_entries};
use crate::error::QueueError;
use crate::models::claim_history::ClaimHistory;
use crate::models::entry::{ProcessingState, QueueEntry};

// ============================================================================
// Queue Entry Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = queue_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgQueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub creating_owner: String,
    pub processing_owner: Option<String>,
    pub processing_state: String,
    pub next_available_at: DateTime<Utc>,
    pub attempts: i32,
    pub account_scope_id: Option<String>,
    pub tenant_scope_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = queue_entries)]
pub struct NewPgQueueEntry {
    pub queue_name: String,
    pub payload: String,
    pub creating_owner: String,
    pub processing_state: String,
    pub next_available_at: DateTime<Utc>,
    pub attempts: i32,
    pub account_scope_id: Option<String>,
    pub tenant_scope_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PgQueueEntry> for QueueEntry {
    type Error = QueueError;

    fn try_from(row: PgQueueEntry) -> Result<Self, Self::Error> {
        Ok(QueueEntry {
            id: row.id,
            queue_name: row.queue_name,
            payload: row.payload,
            creating_owner: row.creating_owner,
            processing_owner: row.processing_owner,
            processing_state: ProcessingState::parse(&row.processing_state)?,
            next_available_at: row.next_available_at,
            attempts: row.attempts,
            account_scope_id: row.account_scope_id,
            tenant_scope_id: row.tenant_scope_id,
            created_at: row.created_at,
        })
    }
}

// ============================================================================
// Claim History Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = claim_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PgClaimHistory {
    pub id: i64,
    pub entry_id: i64,
    pub owner_id: String,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = claim_history)]
pub struct NewPgClaimHistory {
    pub entry_id: i64,
    pub owner_id: String,
    pub claimed_at: DateTime<Utc>,
}

impl From<PgClaimHistory> for ClaimHistory {
    fn from(row: PgClaimHistory) -> Self {
        ClaimHistory {
            id: row.id,
            entry_id: row.entry_id,
            owner_id: row.owner_id,
            claimed_at: row.claimed_at,
        }
    }
}
