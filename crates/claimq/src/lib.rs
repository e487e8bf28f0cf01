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

//! # Claimq
//!
//! A Rust library for durable, claim-based work queues with at-least-once
//! delivery.
//!
//! Claimq persists units of work (entries) in a shared PostgreSQL or SQLite
//! store and lets any number of consumer processes compete for them. Exclusive
//! ownership is granted through an atomic claim that doubles as a lease: a
//! consumer that crashes mid-flight simply lets its lease expire, after which
//! any consumer may reclaim the entry. Application-level failures walk a
//! per-queue backoff schedule until the entry either succeeds or is given up.
//!
//! # Key Concepts
//!
//! - **Entry**: a durable work item carrying an opaque JSON payload plus
//!   lifecycle metadata. The core never interprets the payload.
//! - **Claim**: an atomic conditional update granting exclusive, time-bounded
//!   ownership of an entry. Exactly one claimant wins a given attempt.
//! - **Lease**: while an entry is `InProcessing`, `next_available_at` is the
//!   lease expiry. A lease that has lapsed makes the entry eligible again;
//!   this is the crash-recovery path.
//! - **Backoff schedule**: an ordered, finite list of delays applied on
//!   successive retryable handler failures. Exhausting it gives the entry up.
//! - **Handler**: the single consumer-side callback registered for a queue
//!   name. Because delivery is at-least-once, handlers must be idempotent.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use claimq::{Database, HandlerError, NewQueueEntry, QueueConfig, QueueEntry};
//! use claimq::{QueueHandler, QueueService};
//! use std::sync::Arc;
//!
//! struct InvoiceNotifier;
//!
//! #[async_trait::async_trait]
//! impl QueueHandler for InvoiceNotifier {
//!     async fn handle(&self, entry: &QueueEntry) -> Result<(), HandlerError> {
//!         // Interpret the payload; must tolerate duplicate delivery.
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let database = Database::new("postgres://localhost:5432/billing", 10);
//! database.run_migrations().await?;
//!
//! let mut service = QueueService::new(database);
//! service.register_queue(
//!     QueueConfig::builder("invoice-notifications").build(),
//!     Arc::new(InvoiceNotifier),
//! )?;
//! service.start()?;
//!
//! service
//!     .enqueue(NewQueueEntry::new(
//!         "invoice-notifications",
//!         r#"{"invoice_id": 42}"#,
//!         "api-server-1",
//!     ))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery Guarantees
//!
//! Claimq guarantees at-least-once delivery: a claimed entry whose consumer
//! dies or whose handler overruns its timeout is reclaimed after lease
//! expiry and handled again. Ordering across concurrent consumers is
//! best-effort only; queues that need strict ordering must carry their own
//! ordering key in the payload and re-sort at the consumption point.

pub mod config;
pub mod consumer;
pub mod dal;
pub mod database;
pub mod error;
pub mod handler;
pub mod models;
pub mod retry;
pub mod service;

pub use config::{CompleteBehavior, QueueConfig, QueueConfigBuilder};
pub use consumer::QueueConsumer;
pub use dal::DAL;
pub use database::{BackendType, Database, UniversalTimestamp};
pub use error::{HandlerError, QueueError, RegistrationError};
pub use handler::{HandlerRegistry, QueueHandler};
pub use models::claim_history::ClaimHistory;
pub use models::entry::{NewQueueEntry, ProcessingState, QueueEntry, ScopeFilter};
pub use retry::{BackoffSchedule, RetryDecision};
pub use service::QueueService;
