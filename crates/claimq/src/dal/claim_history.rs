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

//! Claim history DAL: append-only audit trail with runtime backend selection.
//!
//! One record per successful claim. Records are never updated or deleted,
//! so the trail remains available to operators after entries are cleared
//! or removed.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::DAL;
use crate::error::QueueError;
use crate::models::claim_history::ClaimHistory;

/// Data access layer for claim audit records with runtime backend selection.
#[derive(Clone)]
pub struct ClaimHistoryDAL<'a> {
    dal: &'a DAL,
}

impl<'a> ClaimHistoryDAL<'a> {
    /// Creates a new ClaimHistoryDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Appends an audit record for a successful claim.
    pub async fn record_claim(
        &self,
        entry_id: i64,
        owner_id: &str,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.record_claim_postgres(entry_id, owner_id, claimed_at)
                .await,
            self.record_claim_sqlite(entry_id, owner_id, claimed_at)
                .await
        )
    }

    #[cfg(feature = "postgres")]
    async fn record_claim_postgres(
        &self,
        entry_id: i64,
        owner_id: &str,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        use crate::dal::postgres_models::NewPgClaimHistory;
        use crate::database::schema::postgres::claim_history;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let record = NewPgClaimHistory {
            entry_id,
            owner_id: owner_id.to_string(),
            claimed_at,
        };

        conn.interact(move |conn| {
            diesel::insert_into(claim_history::table)
                .values(&record)
                .execute(conn)
        })
        .await
        .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    #[cfg(feature = "sqlite")]
    async fn record_claim_sqlite(
        &self,
        entry_id: i64,
        owner_id: &str,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        use crate::dal::sqlite_models::NewSqliteClaimHistory;
        use crate::database::schema::sqlite::claim_history;
        use crate::database::universal_types::UniversalTimestamp;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let record = NewSqliteClaimHistory {
            entry_id,
            owner_id: owner_id.to_string(),
            claimed_at: UniversalTimestamp::from(claimed_at).to_rfc3339(),
        };

        conn.interact(move |conn| {
            diesel::insert_into(claim_history::table)
                .values(&record)
                .execute(conn)
        })
        .await
        .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Returns the full claim trail for one entry, oldest first.
    pub async fn history_for_entry(&self, entry_id: i64) -> Result<Vec<ClaimHistory>, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.history_for_entry_postgres(entry_id).await,
            self.history_for_entry_sqlite(entry_id).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn history_for_entry_postgres(
        &self,
        entry_id: i64,
    ) -> Result<Vec<ClaimHistory>, QueueError> {
        use crate::dal::postgres_models::PgClaimHistory;
        use crate::database::schema::postgres::claim_history;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let rows: Vec<PgClaimHistory> = conn
            .interact(move |conn| {
                claim_history::table
                    .filter(claim_history::entry_id.eq(entry_id))
                    .order(claim_history::id.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg(feature = "sqlite")]
    async fn history_for_entry_sqlite(
        &self,
        entry_id: i64,
    ) -> Result<Vec<ClaimHistory>, QueueError> {
        use crate::dal::sqlite_models::SqliteClaimHistory;
        use crate::database::schema::sqlite::claim_history;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let rows: Vec<SqliteClaimHistory> = conn
            .interact(move |conn| {
                claim_history::table
                    .filter(claim_history::entry_id.eq(entry_id))
                    .order(claim_history::id.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
