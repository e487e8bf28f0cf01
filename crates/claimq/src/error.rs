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

//! Error types for queue storage, registration and handler execution.

use thiserror::Error;

/// Boxed error type carried by handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the durable store and its data access layer.
///
/// Store errors during a poll tick are transient from the consumer's point
/// of view: the tick is logged and the loop continues; no entry state is
/// changed.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Failed to obtain a connection from the pool
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Running embedded migrations failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// A stored timestamp could not be parsed back into a UTC instant
    #[error("Invalid stored timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),

    /// A stored processing state did not match any known variant
    #[error("Unknown processing state: {0}")]
    UnknownState(String),

    /// Payload serialization or deserialization failed
    #[error("Payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Required configuration was missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised while wiring queues and handlers at startup.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A handler is already registered for this queue name
    #[error("Duplicate handler registration for queue '{queue_name}'")]
    DuplicateQueue { queue_name: String },
}

/// Outcome classification for handler failures.
///
/// The variant decides the entry's fate: `Retryable` walks the queue's
/// backoff schedule (and gives up once it is exhausted), `Fatal` gives the
/// entry up immediately regardless of remaining schedule budget.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Transient application failure; the entry should be rescheduled
    #[error("Retryable handler failure: {0}")]
    Retryable(BoxError),

    /// Permanent application failure; the entry must not be retried
    #[error("Fatal handler failure: {0}")]
    Fatal(BoxError),
}

impl HandlerError {
    /// Wraps an error as a retryable failure.
    pub fn retryable(error: impl Into<BoxError>) -> Self {
        Self::Retryable(error.into())
    }

    /// Wraps an error as a fatal, non-retryable failure.
    pub fn fatal(error: impl Into<BoxError>) -> Self {
        Self::Fatal(error.into())
    }
}
