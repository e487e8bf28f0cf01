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

//! Queue service assembly.
//!
//! `QueueService` wires the store, DAL, handler registry and consumers
//! together through explicit constructor composition: every dependency is
//! passed in directly, resolved once at startup. There is no container and
//! no process-wide lookup.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::QueueConfig;
use crate::consumer::QueueConsumer;
use crate::dal::DAL;
use crate::database::Database;
use crate::error::{QueueError, RegistrationError};
use crate::handler::{HandlerRegistry, QueueHandler};
use crate::models::entry::{NewQueueEntry, QueueEntry};

/// Owns the store handle, handler registry and one consumer per
/// registered queue.
///
/// # Lifecycle
///
/// 1. [`register_queue`](Self::register_queue) each queue with its config
///    and handler (duplicate names are rejected).
/// 2. [`start`](Self::start) spawns one consumer task per queue.
/// 3. [`shutdown`](Self::shutdown) signals all consumers and waits for
///    their in-flight workers to drain.
///
/// The producer surface ([`enqueue`](Self::enqueue) /
/// [`enqueue_json`](Self::enqueue_json)) is available whether or not the
/// consumers are running; a pure producer process simply never calls
/// `start`.
pub struct QueueService {
    database: Database,
    dal: DAL,
    registry: HandlerRegistry,
    configs: Vec<QueueConfig>,
    consumers: Vec<Arc<QueueConsumer>>,
    handles: Vec<JoinHandle<()>>,
}

impl QueueService {
    /// Creates a service over an existing database handle.
    pub fn new(database: Database) -> Self {
        let dal = DAL::new(database.clone());
        Self {
            database,
            dal,
            registry: HandlerRegistry::new(),
            configs: Vec::new(),
            consumers: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Registers a queue: its configuration and the single handler
    /// responsible for its payload type.
    pub fn register_queue(
        &mut self,
        config: QueueConfig,
        handler: Arc<dyn QueueHandler>,
    ) -> Result<(), RegistrationError> {
        self.registry
            .register(config.queue_name().to_string(), handler)?;
        self.configs.push(config);
        Ok(())
    }

    /// Spawns one consumer task per registered queue.
    pub fn start(&mut self) -> Result<(), QueueError> {
        if !self.handles.is_empty() {
            return Err(QueueError::Configuration(
                "queue service already started".to_string(),
            ));
        }

        for config in &self.configs {
            let handler = match self.registry.get(config.queue_name()) {
                Some(handler) => handler,
                // register_queue always pairs config with handler; this
                // only trips if the registry was bypassed.
                None => {
                    return Err(QueueError::Configuration(format!(
                        "no handler registered for queue '{}'",
                        config.queue_name()
                    )))
                }
            };

            let consumer = Arc::new(QueueConsumer::new(
                self.dal.clone(),
                config.clone(),
                handler,
            ));
            let runner = Arc::clone(&consumer);
            self.handles.push(tokio::spawn(async move {
                runner.run().await;
            }));
            self.consumers.push(consumer);
        }

        info!(queues = self.consumers.len(), "Queue service started");
        Ok(())
    }

    /// Signals every consumer to stop and waits for them to drain.
    pub async fn shutdown(&mut self) {
        for consumer in &self.consumers {
            consumer.shutdown();
        }
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Consumer task ended abnormally during shutdown");
            }
        }
        self.consumers.clear();
        info!("Queue service stopped");
    }

    /// Inserts a new entry into its queue.
    pub async fn enqueue(&self, new_entry: NewQueueEntry) -> Result<QueueEntry, QueueError> {
        self.dal.entry().insert(new_entry).await
    }

    /// Serializes a typed payload and inserts it into the queue.
    pub async fn enqueue_json<T: Serialize>(
        &self,
        queue_name: &str,
        payload: &T,
        creating_owner: &str,
    ) -> Result<QueueEntry, QueueError> {
        let payload = serde_json::to_string(payload)?;
        self.enqueue(NewQueueEntry::new(queue_name, payload, creating_owner))
            .await
    }

    /// The underlying DAL, for operational queries over queue state.
    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl std::fmt::Debug for QueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueService")
            .field("queues", &self.registry.queue_names())
            .field("running", &!self.handles.is_empty())
            .finish()
    }
}
