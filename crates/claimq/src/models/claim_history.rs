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

//! Claim History Model
//!
//! Append-only audit trail of successful claims. One record is written per
//! successful claim; records are never mutated or deleted, so the history
//! survives the entry itself when a queue is configured for hard delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single successful claim of a queue entry by a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimHistory {
    /// Store-assigned identifier
    pub id: i64,
    /// The claimed entry
    pub entry_id: i64,
    /// Identity of the consumer that won the claim
    pub owner_id: String,
    /// When the claim succeeded
    pub claimed_at: DateTime<Utc>,
}
