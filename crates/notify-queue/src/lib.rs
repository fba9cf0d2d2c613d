//! # Notify Queue
//!
//! Pluggable message queue abstraction for a notification framework, with a
//! backend that stores messages directly in a System V message queue.
//!
//! This library provides:
//! - A capability-based queue contract (send/receive plus optional peek,
//!   reservation and subscription capabilities)
//! - An injectable message builder pipeline (create, format, guard, observe)
//! - A System V backend with lazy create-or-attach of the native queue
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message records and identifiers
//! - [`hooks`] - Injected collaborators (builder, identity, clock, log sink)
//! - [`contract`] - Backend and capability traits
//! - [`native`] - System V IPC primitives
//! - [`provider`] - Backend configuration and factory
//! - [`providers`] - Backend implementations

// Module declarations
pub mod contract;
pub mod error;
pub mod hooks;
pub mod message;
pub mod native;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use contract::{
    Capabilities, MessageReceiver, MessageSender, Peekable, QueueBackend, QueueContract,
    Reservable, Subscribable,
};
pub use error::{ConfigurationError, QueueError, SerializationError, ValidationError};
pub use hooks::{
    AnonymousIdentity, Clock, DefaultMessageBuilder, FixedClock, IdentityProvider, LogSink,
    MessageBuilder, QueueDependencies, QueueEvent, QueueEventLevel, StaticIdentity, SystemClock,
    TracingLogSink,
};
pub use message::{
    MessageId, MessageRecord, MessageStatus, QueueId, ReceiveLimit, SendOutcome, SubscriberId,
    Timestamp,
};
pub use native::{QueueKey, QueueStats};
pub use provider::{
    BackendConfig, BackendType, QueueFactory, SysVQueueConfig, DEFAULT_KEY_PATH,
    DEFAULT_PERMISSIONS,
};
pub use providers::sysv::{SysVQueueBackend, MESSAGE_TYPE, MSG_MAXSIZE};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
