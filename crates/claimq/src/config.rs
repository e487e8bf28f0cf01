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

//! Per-queue configuration.
//!
//! Everything a consumer needs to run one queue: backoff schedule, lease
//! duration, poll cadence, batch size, worker-pool bound, handler timeout
//! and completion behavior. All externally supplied; nothing is hardcoded
//! at use sites.

use std::time::Duration;

use crate::models::entry::ScopeFilter;
use crate::retry::BackoffSchedule;

/// What happens to an entry when its handler succeeds.
///
/// Ephemeral bus-event queues typically delete the row outright; retry and
/// notification queues may prefer a terminal `Processed` record that stays
/// inspectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteBehavior {
    /// Hard-delete the row on success
    Delete,
    /// Keep the row with terminal state `Processed`
    MarkProcessed,
}

/// Configuration for one queue's consumer.
///
/// # Construction
///
/// Use [`QueueConfig::builder()`] to create a configuration:
///
/// ```rust,ignore
/// use std::time::Duration;
///
/// let config = QueueConfig::builder("payment-retry")
///     .backoff_schedule(vec![Duration::from_secs(3600), Duration::from_secs(86400)])
///     .lease_duration(Duration::from_secs(30))
///     .max_in_flight(8)
///     .build();
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct QueueConfig {
    queue_name: String,
    backoff_schedule: BackoffSchedule,
    lease_duration: Duration,
    poll_interval: Duration,
    batch_size: usize,
    max_in_flight: usize,
    handler_timeout: Duration,
    on_complete: CompleteBehavior,
    scope: ScopeFilter,
}

impl QueueConfig {
    /// Creates a new configuration builder with default values.
    pub fn builder(queue_name: impl Into<String>) -> QueueConfigBuilder {
        QueueConfigBuilder::new(queue_name)
    }

    /// The queue this configuration applies to.
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Delays applied on successive retryable failures.
    pub fn backoff_schedule(&self) -> &BackoffSchedule {
        &self.backoff_schedule
    }

    /// How long a claim protects an entry from other consumers.
    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    /// How often the consumer polls for eligible entries.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Maximum entries fetched per poll tick.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Worker-pool bound: maximum concurrently executing handlers.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Maximum time a handler may run before its worker is abandoned.
    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    /// Completion behavior for successfully handled entries.
    pub fn on_complete(&self) -> CompleteBehavior {
        self.on_complete
    }

    /// Optional tenant/account partition this consumer is restricted to.
    pub fn scope(&self) -> &ScopeFilter {
        &self.scope
    }
}

/// Builder for [`QueueConfig`].
#[derive(Debug, Clone)]
pub struct QueueConfigBuilder {
    config: QueueConfig,
}

impl QueueConfigBuilder {
    fn new(queue_name: impl Into<String>) -> Self {
        Self {
            config: QueueConfig {
                queue_name: queue_name.into(),
                backoff_schedule: BackoffSchedule::new(vec![
                    Duration::from_secs(60),
                    Duration::from_secs(600),
                    Duration::from_secs(3600),
                ]),
                lease_duration: Duration::from_secs(30),
                poll_interval: Duration::from_millis(500),
                batch_size: 10,
                max_in_flight: 4,
                handler_timeout: Duration::from_secs(300),
                on_complete: CompleteBehavior::Delete,
                scope: ScopeFilter::all(),
            },
        }
    }

    /// Sets the backoff schedule.
    pub fn backoff_schedule(mut self, delays: impl Into<BackoffSchedule>) -> Self {
        self.config.backoff_schedule = delays.into();
        self
    }

    /// Sets the lease duration.
    pub fn lease_duration(mut self, value: Duration) -> Self {
        self.config.lease_duration = value;
        self
    }

    /// Sets the poll interval.
    pub fn poll_interval(mut self, value: Duration) -> Self {
        self.config.poll_interval = value;
        self
    }

    /// Sets the per-tick fetch batch size.
    pub fn batch_size(mut self, value: usize) -> Self {
        self.config.batch_size = value;
        self
    }

    /// Sets the worker-pool bound.
    pub fn max_in_flight(mut self, value: usize) -> Self {
        self.config.max_in_flight = value;
        self
    }

    /// Sets the handler timeout.
    pub fn handler_timeout(mut self, value: Duration) -> Self {
        self.config.handler_timeout = value;
        self
    }

    /// Sets the completion behavior.
    pub fn on_complete(mut self, value: CompleteBehavior) -> Self {
        self.config.on_complete = value;
        self
    }

    /// Restricts the consumer to one tenant/account partition.
    pub fn scope(mut self, value: ScopeFilter) -> Self {
        self.config.scope = value;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> QueueConfig {
        self.config
    }
}
