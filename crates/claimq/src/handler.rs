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

//! Handler trait and registry.
//!
//! Each queue name maps to exactly one handler, resolved once at startup
//! and invoked by plain map lookup (no runtime type dispatch, no event
//! bus). The registry is owned by the service that built it; there is no
//! process-wide registry state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{HandlerError, RegistrationError};
use crate::models::entry::QueueEntry;

/// The single consumer-side callback for one queue.
///
/// # Idempotency
///
/// Delivery is at-least-once: a handler whose worker is abandoned on
/// timeout, or whose process dies before finalizing, will see the same
/// entry again after lease expiry. Implementations MUST tolerate duplicate
/// delivery of the same payload.
///
/// # Outcome contract
///
/// - `Ok(())`: the entry is cleared (deleted or marked processed, per
///   queue configuration).
/// - `Err(HandlerError::Retryable)`: the entry walks the queue's backoff
///   schedule and is given up once the schedule is exhausted.
/// - `Err(HandlerError::Fatal)`: the entry is given up immediately.
#[async_trait]
pub trait QueueHandler: Send + Sync {
    /// Processes one claimed entry.
    async fn handle(&self, entry: &QueueEntry) -> Result<(), HandlerError>;
}

/// Maps queue names to their handlers.
///
/// Built during assembly, then read-only for the life of the service.
/// Duplicate registration for a queue name is a startup error.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn QueueHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for a queue name.
    pub fn register(
        &mut self,
        queue_name: impl Into<String>,
        handler: Arc<dyn QueueHandler>,
    ) -> Result<(), RegistrationError> {
        let queue_name = queue_name.into();
        if self.handlers.contains_key(&queue_name) {
            return Err(RegistrationError::DuplicateQueue { queue_name });
        }
        tracing::debug!(queue_name = %queue_name, "Registered queue handler");
        self.handlers.insert(queue_name, handler);
        Ok(())
    }

    /// Looks up the handler for a queue name.
    pub fn get(&self, queue_name: &str) -> Option<Arc<dyn QueueHandler>> {
        self.handlers.get(queue_name).cloned()
    }

    /// Whether a handler is registered for this queue name.
    pub fn contains(&self, queue_name: &str) -> bool {
        self.handlers.contains_key(queue_name)
    }

    /// All registered queue names.
    pub fn queue_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("queues", &self.queue_names())
            .finish()
    }
}
