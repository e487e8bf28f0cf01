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

//! SQLite-specific database models
//!
//! Diesel model definitions using SQLite-compatible types: timestamps are
//! stored as fixed-width RFC3339 TEXT so that SQL `<=` comparisons order
//! chronologically. These models are used internally by the SQLite DAL
//! paths and converted to/from domain types at the DAL boundary.

use diesel::prelude::*;

use crate::database::schema::sqlite::{claim_history, queue_entries};
use crate::database::universal_types::UniversalTimestamp;
use crate::error::QueueError;
use crate::models::claim_history::ClaimHistory;
use crate::models::entry::{ProcessingState, QueueEntry};

// ============================================================================
// Queue Entry Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = queue_entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteQueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub creating_owner: String,
    pub processing_owner: Option<String>,
    pub processing_state: String,
    pub next_available_at: String,
    pub attempts: i32,
    pub account_scope_id: Option<String>,
    pub tenant_scope_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = queue_entries)]
pub struct NewSqliteQueueEntry {
    pub queue_name: String,
    pub payload: String,
    pub creating_owner: String,
    pub processing_state: String,
    pub next_available_at: String,
    pub attempts: i32,
    pub account_scope_id: Option<String>,
    pub tenant_scope_id: Option<String>,
    pub created_at: String,
}

impl TryFrom<SqliteQueueEntry> for QueueEntry {
    type Error = QueueError;

    fn try_from(row: SqliteQueueEntry) -> Result<Self, Self::Error> {
        Ok(QueueEntry {
            id: row.id,
            queue_name: row.queue_name,
            payload: row.payload,
            creating_owner: row.creating_owner,
            processing_owner: row.processing_owner,
            processing_state: ProcessingState::parse(&row.processing_state)?,
            next_available_at: UniversalTimestamp::from_rfc3339(&row.next_available_at)?
                .into_inner(),
            attempts: row.attempts,
            account_scope_id: row.account_scope_id,
            tenant_scope_id: row.tenant_scope_id,
            created_at: UniversalTimestamp::from_rfc3339(&row.created_at)?.into_inner(),
        })
    }
}

// ============================================================================
// Claim History Models
// ============================================================================

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = claim_history)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SqliteClaimHistory {
    pub id: i64,
    pub entry_id: i64,
    pub owner_id: String,
    pub claimed_at: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = claim_history)]
pub struct NewSqliteClaimHistory {
    pub entry_id: i64,
    pub owner_id: String,
    pub claimed_at: String,
}

impl TryFrom<SqliteClaimHistory> for ClaimHistory {
    type Error = QueueError;

    fn try_from(row: SqliteClaimHistory) -> Result<Self, Self::Error> {
        Ok(ClaimHistory {
            id: row.id,
            entry_id: row.entry_id,
            owner_id: row.owner_id,
            claimed_at: UniversalTimestamp::from_rfc3339(&row.claimed_at)?.into_inner(),
        })
    }
}
