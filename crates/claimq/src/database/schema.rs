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

//! Per-backend Diesel schema definitions.
//!
//! The two backends store timestamps differently: PostgreSQL uses native
//! `TIMESTAMPTZ` columns while SQLite stores RFC3339 strings in `TEXT`
//! columns. Backend-specific model structs in the DAL convert to and from
//! the shared domain types at the DAL boundary.

/// PostgreSQL schema: native timestamp columns.
#[cfg(feature = "postgres")]
pub mod postgres {
    diesel::table! {
        queue_entries (id) {
            id -> BigInt,
            queue_name -> Text,
            payload -> Text,
            creating_owner -> Text,
            processing_owner -> Nullable<Text>,
            processing_state -> Text,
            next_available_at -> Timestamptz,
            attempts -> Integer,
            account_scope_id -> Nullable<Text>,
            tenant_scope_id -> Nullable<Text>,
            created_at -> Timestamptz,
        }
    }

    diesel::table! {
        claim_history (id) {
            id -> BigInt,
            entry_id -> BigInt,
            owner_id -> Text,
            claimed_at -> Timestamptz,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(queue_entries, claim_history);
}

/// SQLite schema: timestamps stored as RFC3339 TEXT.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    diesel::table! {
        queue_entries (id) {
            id -> BigInt,
            queue_name -> Text,
            payload -> Text,
            creating_owner -> Text,
            processing_owner -> Nullable<Text>,
            processing_state -> Text,
            next_available_at -> Text,
            attempts -> Integer,
            account_scope_id -> Nullable<Text>,
            tenant_scope_id -> Nullable<Text>,
            created_at -> Text,
        }
    }

    diesel::table! {
        claim_history (id) {
            id -> BigInt,
            entry_id -> BigInt,
            owner_id -> Text,
            claimed_at -> Text,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(queue_entries, claim_history);
}
