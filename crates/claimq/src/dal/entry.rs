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

//! Queue entry DAL: insert, eligibility fetch, atomic claim, owner-guarded
//! finalization and operational queries, with runtime backend selection.
//!
//! The claim is a single conditional UPDATE whose WHERE clause restates the
//! eligibility predicate and returns the updated row. Both backends apply a
//! single UPDATE atomically (PostgreSQL via row locking, SQLite via its
//! write lock), so exactly one of N concurrent claimants observes an
//! affected row; the rest get `None` back and must move on.
//!
//! `clear` and `reschedule` carry an owner guard: they only take effect if
//! the caller still owns the entry. A consumer whose lease expired and was
//! superseded by another claimant gets `false` back and must not touch the
//! entry again.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::DAL;
use crate::config::CompleteBehavior;
use crate::error::QueueError;
use crate::models::entry::{NewQueueEntry, ProcessingState, QueueEntry, ScopeFilter};

/// States in which an entry may still be claimed, given the right time.
const CLAIMABLE_STATES: [&str; 2] = ["Available", "InProcessing"];

/// Data access layer for queue entry operations with runtime backend selection.
#[derive(Clone)]
pub struct QueueEntryDAL<'a> {
    dal: &'a DAL,
}

impl<'a> QueueEntryDAL<'a> {
    /// Creates a new QueueEntryDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a new entry in state `Available`.
    ///
    /// The store assigns the id. `effective_at` controls the earliest claim
    /// time (delayed/scheduled work); `None` means immediately.
    pub async fn insert(&self, new_entry: NewQueueEntry) -> Result<QueueEntry, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.insert_postgres(new_entry).await,
            self.insert_sqlite(new_entry).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn insert_postgres(&self, new_entry: NewQueueEntry) -> Result<QueueEntry, QueueError> {
        use crate::dal::postgres_models::{NewPgQueueEntry, PgQueueEntry};
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let now = Utc::now();
        let row = NewPgQueueEntry {
            queue_name: new_entry.queue_name,
            payload: new_entry.payload,
            creating_owner: new_entry.creating_owner,
            processing_state: ProcessingState::Available.as_str().to_string(),
            next_available_at: new_entry.effective_at.unwrap_or(now),
            attempts: 0,
            account_scope_id: new_entry.account_scope_id,
            tenant_scope_id: new_entry.tenant_scope_id,
            created_at: now,
        };

        let inserted: PgQueueEntry = conn
            .interact(move |conn| {
                diesel::insert_into(queue_entries::table)
                    .values(&row)
                    .returning(PgQueueEntry::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        inserted.try_into()
    }

    #[cfg(feature = "sqlite")]
    async fn insert_sqlite(&self, new_entry: NewQueueEntry) -> Result<QueueEntry, QueueError> {
        use crate::dal::sqlite_models::{NewSqliteQueueEntry, SqliteQueueEntry};
        use crate::database::schema::sqlite::queue_entries;
        use crate::database::universal_types::UniversalTimestamp;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let now = UniversalTimestamp::now();
        let row = NewSqliteQueueEntry {
            queue_name: new_entry.queue_name,
            payload: new_entry.payload,
            creating_owner: new_entry.creating_owner,
            processing_state: ProcessingState::Available.as_str().to_string(),
            next_available_at: new_entry
                .effective_at
                .map(UniversalTimestamp::from)
                .unwrap_or(now)
                .to_rfc3339(),
            attempts: 0,
            account_scope_id: new_entry.account_scope_id,
            tenant_scope_id: new_entry.tenant_scope_id,
            created_at: now.to_rfc3339(),
        };

        let inserted: SqliteQueueEntry = conn
            .interact(move |conn| {
                diesel::insert_into(queue_entries::table)
                    .values(&row)
                    .returning(SqliteQueueEntry::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        inserted.try_into()
    }

    /// Fetches entries that are claimable at `now`, ordered by
    /// `(next_available_at, id)` ascending and bounded by `limit`.
    ///
    /// Includes `Available` entries whose effective time has passed and
    /// `InProcessing` entries whose lease has expired. Scope filters
    /// restrict the result to one tenant/account partition.
    pub async fn fetch_eligible(
        &self,
        queue_name: &str,
        scope: &ScopeFilter,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.fetch_eligible_postgres(queue_name, scope, now, limit)
                .await,
            self.fetch_eligible_sqlite(queue_name, scope, now, limit)
                .await
        )
    }

    #[cfg(feature = "postgres")]
    async fn fetch_eligible_postgres(
        &self,
        queue_name: &str,
        scope: &ScopeFilter,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        use crate::dal::postgres_models::PgQueueEntry;
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();
        let scope = scope.clone();

        let rows: Vec<PgQueueEntry> = conn
            .interact(move |conn| {
                let mut query = queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq_any(CLAIMABLE_STATES))
                    .filter(queue_entries::next_available_at.le(now))
                    .into_boxed();

                if let Some(account) = scope.account_scope_id {
                    query = query.filter(queue_entries::account_scope_id.eq(account));
                }
                if let Some(tenant) = scope.tenant_scope_id {
                    query = query.filter(queue_entries::tenant_scope_id.eq(tenant));
                }

                query
                    .order((
                        queue_entries::next_available_at.asc(),
                        queue_entries::id.asc(),
                    ))
                    .limit(limit)
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[cfg(feature = "sqlite")]
    async fn fetch_eligible_sqlite(
        &self,
        queue_name: &str,
        scope: &ScopeFilter,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        use crate::dal::sqlite_models::SqliteQueueEntry;
        use crate::database::schema::sqlite::queue_entries;
        use crate::database::universal_types::UniversalTimestamp;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();
        let scope = scope.clone();
        let now = UniversalTimestamp::from(now).to_rfc3339();

        let rows: Vec<SqliteQueueEntry> = conn
            .interact(move |conn| {
                let mut query = queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq_any(CLAIMABLE_STATES))
                    .filter(queue_entries::next_available_at.le(now))
                    .into_boxed();

                if let Some(account) = scope.account_scope_id {
                    query = query.filter(queue_entries::account_scope_id.eq(account));
                }
                if let Some(tenant) = scope.tenant_scope_id {
                    query = query.filter(queue_entries::tenant_scope_id.eq(tenant));
                }

                query
                    .order((
                        queue_entries::next_available_at.asc(),
                        queue_entries::id.asc(),
                    ))
                    .limit(limit)
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Atomically claims an entry, granting `owner` an exclusive lease
    /// until `lease_deadline`.
    ///
    /// Succeeds only if the entry is eligible at the moment of the call:
    /// `Available`, or `InProcessing` with an expired lease. On success the
    /// entry flips to `InProcessing` with the new owner and lease, and the
    /// updated row is returned. `None` means the claim was lost (another
    /// claimant won the race, or the entry is no longer eligible); the
    /// caller must not retry this specific attempt.
    pub async fn claim(
        &self,
        id: i64,
        owner: &str,
        lease_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.claim_postgres(id, owner, lease_deadline, now).await,
            self.claim_sqlite(id, owner, lease_deadline, now).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn claim_postgres(
        &self,
        id: i64,
        owner: &str,
        lease_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>, QueueError> {
        use crate::dal::postgres_models::PgQueueEntry;
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let owner = owner.to_string();

        let claimed: Option<PgQueueEntry> = conn
            .interact(move |conn| {
                // Single conditional UPDATE: the WHERE clause is the
                // eligibility predicate, so exactly one concurrent claimant
                // can match the row.
                diesel::update(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(
                            queue_entries::processing_state.eq("Available").or(
                                queue_entries::processing_state
                                    .eq("InProcessing")
                                    .and(queue_entries::next_available_at.le(now)),
                            ),
                        ),
                )
                .set((
                    queue_entries::processing_state.eq("InProcessing"),
                    queue_entries::processing_owner.eq(owner),
                    queue_entries::next_available_at.eq(lease_deadline),
                ))
                .returning(PgQueueEntry::as_returning())
                .get_result(conn)
                .optional()
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        claimed.map(TryInto::try_into).transpose()
    }

    #[cfg(feature = "sqlite")]
    async fn claim_sqlite(
        &self,
        id: i64,
        owner: &str,
        lease_deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<QueueEntry>, QueueError> {
        use crate::dal::sqlite_models::SqliteQueueEntry;
        use crate::database::schema::sqlite::queue_entries;
        use crate::database::universal_types::UniversalTimestamp;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let owner = owner.to_string();
        let now = UniversalTimestamp::from(now).to_rfc3339();
        let lease_deadline = UniversalTimestamp::from(lease_deadline).to_rfc3339();

        let claimed: Option<SqliteQueueEntry> = conn
            .interact(move |conn| {
                // SQLite serializes writers, so the same conditional UPDATE
                // gives one winner per claim attempt.
                diesel::update(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(
                            queue_entries::processing_state.eq("Available").or(
                                queue_entries::processing_state
                                    .eq("InProcessing")
                                    .and(queue_entries::next_available_at.le(now)),
                            ),
                        ),
                )
                .set((
                    queue_entries::processing_state.eq("InProcessing"),
                    queue_entries::processing_owner.eq(owner),
                    queue_entries::next_available_at.eq(lease_deadline),
                ))
                .returning(SqliteQueueEntry::as_returning())
                .get_result(conn)
                .optional()
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        claimed.map(TryInto::try_into).transpose()
    }

    /// Finalizes a successfully handled entry.
    ///
    /// Owner-guarded: only takes effect if `owner` still holds the lease.
    /// Depending on the queue's completion behavior the row is hard-deleted
    /// or marked `Processed` (terminal, inspectable). Returns `false` if the
    /// guard failed: the caller was superseded and must not retry.
    pub async fn clear(
        &self,
        id: i64,
        owner: &str,
        on_complete: CompleteBehavior,
    ) -> Result<bool, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.clear_postgres(id, owner, on_complete).await,
            self.clear_sqlite(id, owner, on_complete).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn clear_postgres(
        &self,
        id: i64,
        owner: &str,
        on_complete: CompleteBehavior,
    ) -> Result<bool, QueueError> {
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let owner = owner.to_string();

        let affected = conn
            .interact(move |conn| match on_complete {
                CompleteBehavior::Delete => diesel::delete(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(queue_entries::processing_state.eq("InProcessing"))
                        .filter(queue_entries::processing_owner.eq(owner)),
                )
                .execute(conn),
                CompleteBehavior::MarkProcessed => diesel::update(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(queue_entries::processing_state.eq("InProcessing"))
                        .filter(queue_entries::processing_owner.eq(owner)),
                )
                // The owner column is left in place as a record of who
                // completed the entry.
                .set(queue_entries::processing_state.eq("Processed"))
                .execute(conn),
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(affected == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn clear_sqlite(
        &self,
        id: i64,
        owner: &str,
        on_complete: CompleteBehavior,
    ) -> Result<bool, QueueError> {
        use crate::database::schema::sqlite::queue_entries;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let owner = owner.to_string();

        let affected = conn
            .interact(move |conn| match on_complete {
                CompleteBehavior::Delete => diesel::delete(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(queue_entries::processing_state.eq("InProcessing"))
                        .filter(queue_entries::processing_owner.eq(owner)),
                )
                .execute(conn),
                CompleteBehavior::MarkProcessed => diesel::update(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(queue_entries::processing_state.eq("InProcessing"))
                        .filter(queue_entries::processing_owner.eq(owner)),
                )
                .set(queue_entries::processing_state.eq("Processed"))
                .execute(conn),
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(affected == 1)
    }

    /// Reschedules an entry for a later retry.
    ///
    /// Owner-guarded like [`clear`](Self::clear). On success the entry
    /// returns to `Available` with the new effective time, the owner is
    /// cleared, and the attempt counter is incremented atomically with the
    /// state flip.
    pub async fn reschedule(
        &self,
        id: i64,
        owner: &str,
        next_available_at: DateTime<Utc>,
    ) -> Result<bool, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.reschedule_postgres(id, owner, next_available_at).await,
            self.reschedule_sqlite(id, owner, next_available_at).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn reschedule_postgres(
        &self,
        id: i64,
        owner: &str,
        next_available_at: DateTime<Utc>,
    ) -> Result<bool, QueueError> {
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let owner = owner.to_string();

        let affected = conn
            .interact(move |conn| {
                diesel::update(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(queue_entries::processing_state.eq("InProcessing"))
                        .filter(queue_entries::processing_owner.eq(owner)),
                )
                .set((
                    queue_entries::processing_state.eq("Available"),
                    queue_entries::processing_owner.eq(None::<String>),
                    queue_entries::next_available_at.eq(next_available_at),
                    queue_entries::attempts.eq(queue_entries::attempts + 1),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(affected == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn reschedule_sqlite(
        &self,
        id: i64,
        owner: &str,
        next_available_at: DateTime<Utc>,
    ) -> Result<bool, QueueError> {
        use crate::database::schema::sqlite::queue_entries;
        use crate::database::universal_types::UniversalTimestamp;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let owner = owner.to_string();
        let next_available_at = UniversalTimestamp::from(next_available_at).to_rfc3339();

        let affected = conn
            .interact(move |conn| {
                diesel::update(
                    queue_entries::table
                        .filter(queue_entries::id.eq(id))
                        .filter(queue_entries::processing_state.eq("InProcessing"))
                        .filter(queue_entries::processing_owner.eq(owner)),
                )
                .set((
                    queue_entries::processing_state.eq("Available"),
                    queue_entries::processing_owner.eq(None::<String>),
                    queue_entries::next_available_at.eq(next_available_at),
                    queue_entries::attempts.eq(queue_entries::attempts + 1),
                ))
                .execute(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(affected == 1)
    }

    /// Hard-deletes an entry without an owner check.
    ///
    /// Used on the give-up and fatal paths by the process that just
    /// validated ownership via the preceding claim. Returns `false` if the
    /// entry was already gone.
    pub async fn remove(&self, id: i64) -> Result<bool, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.remove_postgres(id).await,
            self.remove_sqlite(id).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn remove_postgres(&self, id: i64) -> Result<bool, QueueError> {
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let affected = conn
            .interact(move |conn| {
                diesel::delete(queue_entries::table.filter(queue_entries::id.eq(id))).execute(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(affected == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn remove_sqlite(&self, id: i64) -> Result<bool, QueueError> {
        use crate::database::schema::sqlite::queue_entries;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let affected = conn
            .interact(move |conn| {
                diesel::delete(queue_entries::table.filter(queue_entries::id.eq(id))).execute(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(affected == 1)
    }

    /// Looks up a single entry by id.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<QueueEntry>, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.get_by_id_postgres(id).await,
            self.get_by_id_sqlite(id).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn get_by_id_postgres(&self, id: i64) -> Result<Option<QueueEntry>, QueueError> {
        use crate::dal::postgres_models::PgQueueEntry;
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let row: Option<PgQueueEntry> = conn
            .interact(move |conn| queue_entries::table.find(id).first(conn).optional())
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        row.map(TryInto::try_into).transpose()
    }

    #[cfg(feature = "sqlite")]
    async fn get_by_id_sqlite(&self, id: i64) -> Result<Option<QueueEntry>, QueueError> {
        use crate::dal::sqlite_models::SqliteQueueEntry;
        use crate::database::schema::sqlite::queue_entries;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let row: Option<SqliteQueueEntry> = conn
            .interact(move |conn| queue_entries::table.find(id).first(conn).optional())
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        row.map(TryInto::try_into).transpose()
    }

    /// Lists all non-terminal entries for a scope, including future-dated
    /// ones. Operational query ("all pending work for this tenant").
    pub async fn pending_for_scope(
        &self,
        queue_name: &str,
        scope: &ScopeFilter,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.pending_for_scope_postgres(queue_name, scope).await,
            self.pending_for_scope_sqlite(queue_name, scope).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn pending_for_scope_postgres(
        &self,
        queue_name: &str,
        scope: &ScopeFilter,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        use crate::dal::postgres_models::PgQueueEntry;
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();
        let scope = scope.clone();

        let rows: Vec<PgQueueEntry> = conn
            .interact(move |conn| {
                let mut query = queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq_any(CLAIMABLE_STATES))
                    .into_boxed();

                if let Some(account) = scope.account_scope_id {
                    query = query.filter(queue_entries::account_scope_id.eq(account));
                }
                if let Some(tenant) = scope.tenant_scope_id {
                    query = query.filter(queue_entries::tenant_scope_id.eq(tenant));
                }

                query
                    .order((
                        queue_entries::next_available_at.asc(),
                        queue_entries::id.asc(),
                    ))
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[cfg(feature = "sqlite")]
    async fn pending_for_scope_sqlite(
        &self,
        queue_name: &str,
        scope: &ScopeFilter,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        use crate::dal::sqlite_models::SqliteQueueEntry;
        use crate::database::schema::sqlite::queue_entries;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();
        let scope = scope.clone();

        let rows: Vec<SqliteQueueEntry> = conn
            .interact(move |conn| {
                let mut query = queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq_any(CLAIMABLE_STATES))
                    .into_boxed();

                if let Some(account) = scope.account_scope_id {
                    query = query.filter(queue_entries::account_scope_id.eq(account));
                }
                if let Some(tenant) = scope.tenant_scope_id {
                    query = query.filter(queue_entries::tenant_scope_id.eq(tenant));
                }

                query
                    .order((
                        queue_entries::next_available_at.asc(),
                        queue_entries::id.asc(),
                    ))
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Counts non-terminal entries for a queue.
    pub async fn count_pending(&self, queue_name: &str) -> Result<i64, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.count_pending_postgres(queue_name).await,
            self.count_pending_sqlite(queue_name).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn count_pending_postgres(&self, queue_name: &str) -> Result<i64, QueueError> {
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();

        let count: i64 = conn
            .interact(move |conn| {
                queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq_any(CLAIMABLE_STATES))
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    #[cfg(feature = "sqlite")]
    async fn count_pending_sqlite(&self, queue_name: &str) -> Result<i64, QueueError> {
        use crate::database::schema::sqlite::queue_entries;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();

        let count: i64 = conn
            .interact(move |conn| {
                queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq_any(CLAIMABLE_STATES))
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    /// Lists entries currently held under a lease.
    pub async fn in_processing(&self, queue_name: &str) -> Result<Vec<QueueEntry>, QueueError> {
        crate::backend_dispatch!(
            self.dal.backend(),
            self.in_processing_postgres(queue_name).await,
            self.in_processing_sqlite(queue_name).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn in_processing_postgres(&self, queue_name: &str) -> Result<Vec<QueueEntry>, QueueError> {
        use crate::dal::postgres_models::PgQueueEntry;
        use crate::database::schema::postgres::queue_entries;

        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();

        let rows: Vec<PgQueueEntry> = conn
            .interact(move |conn| {
                queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq("InProcessing"))
                    .order(queue_entries::id.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    #[cfg(feature = "sqlite")]
    async fn in_processing_sqlite(&self, queue_name: &str) -> Result<Vec<QueueEntry>, QueueError> {
        use crate::dal::sqlite_models::SqliteQueueEntry;
        use crate::database::schema::sqlite::queue_entries;

        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))?;

        let queue_name = queue_name.to_string();

        let rows: Vec<SqliteQueueEntry> = conn
            .interact(move |conn| {
                queue_entries::table
                    .filter(queue_entries::queue_name.eq(queue_name))
                    .filter(queue_entries::processing_state.eq("InProcessing"))
                    .order(queue_entries::id.asc())
                    .load(conn)
            })
            .await
            .map_err(|e| QueueError::ConnectionPool(e.to_string()))??;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
