//! Collaborators injected into queue backends.
//!
//! A backend never reaches for ambient state: the message builder pipeline,
//! the producer identity, the clock and the log sink are all handed to it
//! at construction through [`QueueDependencies`].

use crate::message::{MessageRecord, Timestamp};
use std::sync::Arc;
use tracing::{error, info};

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;

// ============================================================================
// Message Builder Pipeline
// ============================================================================

/// Strategy for producing the record a send hands to the transport.
///
/// The stages run in order: [`create_message`](Self::create_message),
/// [`format_message`](Self::format_message), then the
/// [`before_send`](Self::before_send) guard. [`after_send`](Self::after_send)
/// only runs once the transport accepted the record.
pub trait MessageBuilder: Send + Sync {
    /// Build a record from the raw body and the resolved producer context
    fn create_message(
        &self,
        body: &str,
        category: Option<&str>,
        created_on: Timestamp,
        sender_id: Option<String>,
    ) -> MessageRecord {
        MessageRecord::new(body, created_on)
            .with_sender_id(sender_id)
            .with_category(category.map(str::to_string))
    }

    /// Shape the record before it is sent
    fn format_message(&self, record: MessageRecord) -> MessageRecord {
        record
    }

    /// Return `false` to cancel the send without it being an error
    fn before_send(&self, _record: &MessageRecord) -> bool {
        true
    }

    /// Observe a record the transport accepted
    fn after_send(&self, _record: &MessageRecord) {}
}

/// Builder that keeps every stage at its default
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessageBuilder;

impl MessageBuilder for DefaultMessageBuilder {}

// ============================================================================
// Identity and Clock
// ============================================================================

/// Resolves the identity of the actor producing messages
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> Option<String>;
}

/// Identity provider for contexts without a signed-in actor
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn current_actor(&self) -> Option<String> {
        None
    }
}

/// Identity provider that always reports the same actor
#[derive(Debug, Clone)]
pub struct StaticIdentity(String);

impl StaticIdentity {
    pub fn new(actor: impl Into<String>) -> Self {
        Self(actor.into())
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Source of UTC time for record creation
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock frozen at one instant
#[derive(Debug, Clone)]
pub struct FixedClock(Timestamp);

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0.clone()
    }
}

// ============================================================================
// Log Sink
// ============================================================================

/// Severity of a [`QueueEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEventLevel {
    Info,
    Error,
}

/// Notable things that happen to messages on their way through a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// The transport accepted a record
    Sent { queue: String, body: String },
    /// The guard hook suppressed a record
    SendCancelled { queue: String, body: String },
    /// The transport refused a record
    SendFailed {
        queue: String,
        body: String,
        reason: String,
    },
    /// The native queue had no room for another record
    QueueFull { queue: String },
    /// Reading from the transport failed
    ReceiveFailed { queue: String, reason: String },
    /// An entry was removed from the transport but could not be decoded
    MalformedEntry { queue: String, reason: String },
}

impl QueueEvent {
    pub fn level(&self) -> QueueEventLevel {
        match self {
            Self::Sent { .. } | Self::SendCancelled { .. } => QueueEventLevel::Info,
            Self::SendFailed { .. }
            | Self::QueueFull { .. }
            | Self::ReceiveFailed { .. }
            | Self::MalformedEntry { .. } => QueueEventLevel::Error,
        }
    }

    pub fn queue(&self) -> &str {
        match self {
            Self::Sent { queue, .. }
            | Self::SendCancelled { queue, .. }
            | Self::SendFailed { queue, .. }
            | Self::QueueFull { queue }
            | Self::ReceiveFailed { queue, .. }
            | Self::MalformedEntry { queue, .. } => queue.as_str(),
        }
    }
}

/// Fire-and-forget receiver of queue events
pub trait LogSink: Send + Sync {
    fn record(&self, event: &QueueEvent);
}

/// Log sink that forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn record(&self, event: &QueueEvent) {
        match event {
            QueueEvent::Sent { queue, body } => {
                info!(target: "notify_queue", queue = %queue, body = %body, "Sent message to queue");
            }
            QueueEvent::SendCancelled { queue, body } => {
                info!(target: "notify_queue", queue = %queue, body = %body, "Not sending message to queue");
            }
            QueueEvent::SendFailed {
                queue,
                body,
                reason,
            } => {
                error!(
                    target: "notify_queue",
                    queue = %queue,
                    body = %body,
                    reason = %reason,
                    "Failed to save message in queue"
                );
            }
            QueueEvent::QueueFull { queue } => {
                error!(target: "notify_queue", queue = %queue, "Queue is full");
            }
            QueueEvent::ReceiveFailed { queue, reason } => {
                error!(target: "notify_queue", queue = %queue, reason = %reason, "Failed to receive from queue");
            }
            QueueEvent::MalformedEntry { queue, reason } => {
                error!(
                    target: "notify_queue",
                    queue = %queue,
                    reason = %reason,
                    "Dropped undecodable entry removed from queue"
                );
            }
        }
    }
}

// ============================================================================
// Dependency Bundle
// ============================================================================

/// Everything a backend needs from its surroundings
#[derive(Clone)]
pub struct QueueDependencies {
    pub builder: Arc<dyn MessageBuilder>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
    pub log_sink: Arc<dyn LogSink>,
}

impl Default for QueueDependencies {
    fn default() -> Self {
        Self {
            builder: Arc::new(DefaultMessageBuilder),
            identity: Arc::new(AnonymousIdentity),
            clock: Arc::new(SystemClock),
            log_sink: Arc::new(TracingLogSink),
        }
    }
}

impl QueueDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(mut self, builder: Arc<dyn MessageBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }

    /// Run the creation and formatting stages for one send
    pub fn build_record(&self, body: &str, category: Option<&str>) -> MessageRecord {
        let record = self.builder.create_message(
            body,
            category,
            self.clock.now(),
            self.identity.current_actor(),
        );
        self.builder.format_message(record)
    }
}

impl std::fmt::Debug for QueueDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueDependencies").finish_non_exhaustive()
    }
}
