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

//! Universal type wrappers for cross-database compatibility
//!
//! This module provides wrapper types that work as domain types, convertible
//! to/from backend-specific database types. These types are used at the API
//! boundary and in business logic, while backend-specific models handle
//! the actual database storage.
//!
//! # Architecture
//!
//! When both postgres and sqlite features are enabled:
//! - Domain code uses `DateTime<Utc>` / `UniversalTimestamp`
//! - PostgreSQL DAL stores native `TIMESTAMPTZ` values
//! - SQLite DAL converts to/from RFC3339 strings
//!
//! This avoids conflicting Diesel trait implementations by keeping
//! Diesel-specific code isolated in backend-specific model modules.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Universal timestamp wrapper for cross-database compatibility
///
/// This is a domain type that wraps DateTime<Utc>. Backend-specific models
/// handle conversion to/from database-native types.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UniversalTimestamp(pub DateTime<Utc>);

impl UniversalTimestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Convert to RFC3339 string for SQLite TEXT storage.
    ///
    /// Always renders microsecond precision and a numeric offset so the
    /// resulting strings are fixed-width: lexicographic TEXT comparison in
    /// SQL then matches chronological order.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, false)
    }

    /// Create from RFC3339 string (SQLite TEXT)
    pub fn from_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(s).map(|dt| UniversalTimestamp(dt.with_timezone(&Utc)))
    }
}

impl fmt::Display for UniversalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for UniversalTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<UniversalTimestamp> for DateTime<Utc> {
    fn from(wrapper: UniversalTimestamp) -> Self {
        wrapper.0
    }
}
