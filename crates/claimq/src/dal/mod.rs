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

//! Unified Data Access Layer with runtime backend selection
//!
//! This module provides a unified DAL implementation that works with both
//! PostgreSQL and SQLite backends, selecting the appropriate implementation
//! at runtime based on the database connection type.
//!
//! # Architecture
//!
//! Each DAL operation dispatches to a backend-specific implementation based
//! on the detected backend type. Backend-specific model structs convert
//! rows to the shared domain types at the DAL boundary, so everything above
//! the DAL works with `QueueEntry` and friends regardless of backend.
//!
//! The `claim` operation is the single point requiring true compare-and-swap
//! semantics; it is implemented as one conditional UPDATE whose WHERE clause
//! restates the eligibility predicate. Every other operation is an ordinary
//! conditional read/write.
//!
//! # Example
//!
//! ```rust,ignore
//! use claimq::dal::DAL;
//! use claimq::database::Database;
//!
//! let db = Database::new("postgres://localhost/billing", 10);
//! let dal = DAL::new(db);
//!
//! // Operations automatically use the correct backend
//! let pending = dal.entry().count_pending("invoice-notifications").await?;
//! ```

use crate::database::{AnyPool, BackendType, Database};

pub mod claim_history;
pub mod entry;

#[cfg(feature = "postgres")]
pub mod postgres_models;
#[cfg(feature = "sqlite")]
pub mod sqlite_models;

pub use claim_history::ClaimHistoryDAL;
pub use entry::QueueEntryDAL;

/// Helper macro for dispatching operations based on backend type.
///
/// This macro simplifies writing code that needs to execute different
/// implementations based on the database backend.
///
/// # Example
///
/// ```rust,ignore
/// crate::backend_dispatch!(
///     self.dal.backend(),
///     self.claim_postgres(id, owner).await,
///     self.claim_sqlite(id, owner).await
/// )
/// ```
#[macro_export]
macro_rules! backend_dispatch {
    ($backend:expr, $pg:expr, $sqlite:expr) => {
        match $backend {
            #[cfg(feature = "postgres")]
            $crate::database::BackendType::Postgres => $pg,
            #[cfg(feature = "sqlite")]
            $crate::database::BackendType::Sqlite => $sqlite,
            #[allow(unreachable_patterns)]
            _ => panic!("database backend not enabled at compile time"),
        }
    };
}

/// The unified Data Access Layer struct.
///
/// This struct provides access to all database operations through a single
/// interface that works with both PostgreSQL and SQLite backends.
///
/// # Thread Safety
///
/// The `DAL` struct is `Clone` and can be safely shared between threads.
/// Each clone references the same underlying database connection pool.
#[derive(Clone, Debug)]
pub struct DAL {
    /// The database instance with connection pool
    pub database: Database,
}

impl DAL {
    /// Creates a new unified DAL instance.
    ///
    /// # Arguments
    ///
    /// * `database` - A Database instance configured for either PostgreSQL or SQLite
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns the backend type for this DAL instance.
    pub fn backend(&self) -> BackendType {
        self.database.backend()
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.database.pool()
    }

    /// Returns a queue entry DAL for entry lifecycle operations.
    pub fn entry(&self) -> QueueEntryDAL {
        QueueEntryDAL::new(self)
    }

    /// Returns a claim history DAL for audit operations.
    pub fn claim_history(&self) -> ClaimHistoryDAL {
        ClaimHistoryDAL::new(self)
    }
}
