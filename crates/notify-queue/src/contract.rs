//! Capability traits for queue backends.
//!
//! Every backend can send and receive. Peeking, reservations and
//! subscriptions are optional capabilities: a backend implements them only
//! when its transport can honour them, and advertises them through
//! [`QueueBackend`]. Callers that want the full operation set use
//! [`QueueContract`], which dispatches to the capability or fails with
//! [`QueueError::Unsupported`] before touching any transport.

use crate::error::QueueError;
use crate::message::{
    MessageId, MessageRecord, MessageStatus, ReceiveLimit, SendOutcome, SubscriberId,
};
use serde::Serialize;

#[cfg(test)]
#[path = "contract_tests.rs"]
mod tests;

/// Producer side of a queue
pub trait MessageSender: Send + Sync {
    /// Build a record from `body` and hand it to the transport
    fn send(&self, body: &str, category: Option<&str>) -> Result<SendOutcome, QueueError>;
}

/// Consumer side of a queue
pub trait MessageReceiver: Send + Sync {
    /// Remove and return messages; received messages are gone for good
    fn receive(
        &self,
        subscriber_id: Option<&SubscriberId>,
        limit: ReceiveLimit,
    ) -> Result<Vec<MessageRecord>, QueueError>;
}

/// Non-destructive reads
pub trait Peekable: Send + Sync {
    /// Return up to `limit` messages in `status` without removing them; `None` means all
    fn peek(
        &self,
        subscriber_id: Option<&SubscriberId>,
        limit: Option<u32>,
        status: MessageStatus,
    ) -> Result<Vec<MessageRecord>, QueueError>;
}

/// Two-phase consumption with explicit acknowledgement
pub trait Reservable: Send + Sync {
    /// Mark up to `limit` available messages as reserved and return them
    fn reserve(
        &self,
        subscriber_id: Option<&SubscriberId>,
        limit: Option<u32>,
    ) -> Result<Vec<MessageRecord>, QueueError>;

    /// Acknowledge a reserved message
    fn delete(
        &self,
        message_id: &MessageId,
        subscriber_id: Option<&SubscriberId>,
    ) -> Result<(), QueueError>;

    /// Return a reserved message to the available pool
    fn release(
        &self,
        message_id: &MessageId,
        subscriber_id: Option<&SubscriberId>,
    ) -> Result<(), QueueError>;
}

/// Durable per-subscriber delivery
pub trait Subscribable: Send + Sync {
    fn subscribe(
        &self,
        subscriber_id: &SubscriberId,
        label: Option<&str>,
        categories: &[String],
        exceptions: &[String],
    ) -> Result<(), QueueError>;

    fn unsubscribe(&self, subscriber_id: &SubscriberId, permanent: bool)
        -> Result<(), QueueError>;

    fn is_subscribed(&self, subscriber_id: &SubscriberId) -> Result<bool, QueueError>;
}

/// Summary of the optional capabilities a backend offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub peek: bool,
    pub reserve: bool,
    pub subscriptions: bool,
}

/// Interface implemented by concrete queue backends
pub trait QueueBackend: MessageSender + MessageReceiver {
    /// Short backend name used in errors and logs
    fn backend_name(&self) -> &'static str;

    /// Logical name of the queue this backend serves
    fn queue_name(&self) -> &str;

    /// Largest wire payload the transport accepts
    fn max_message_size(&self) -> usize;

    fn as_peekable(&self) -> Option<&dyn Peekable> {
        None
    }

    fn as_reservable(&self) -> Option<&dyn Reservable> {
        None
    }

    fn as_subscribable(&self) -> Option<&dyn Subscribable> {
        None
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            peek: self.as_peekable().is_some(),
            reserve: self.as_reservable().is_some(),
            subscriptions: self.as_subscribable().is_some(),
        }
    }
}

/// The complete operation set of a notification queue.
///
/// Implemented for every [`QueueBackend`]. Operations outside the backend's
/// capabilities fail with [`QueueError::Unsupported`].
pub trait QueueContract: QueueBackend {
    fn peek(
        &self,
        subscriber_id: Option<&SubscriberId>,
        limit: Option<u32>,
        status: MessageStatus,
    ) -> Result<Vec<MessageRecord>, QueueError> {
        self.as_peekable()
            .ok_or_else(|| QueueError::unsupported("peek", self.backend_name()))?
            .peek(subscriber_id, limit, status)
    }

    fn reserve(
        &self,
        subscriber_id: Option<&SubscriberId>,
        limit: Option<u32>,
    ) -> Result<Vec<MessageRecord>, QueueError> {
        self.as_reservable()
            .ok_or_else(|| QueueError::unsupported("reserve", self.backend_name()))?
            .reserve(subscriber_id, limit)
    }

    fn delete(
        &self,
        message_id: &MessageId,
        subscriber_id: Option<&SubscriberId>,
    ) -> Result<(), QueueError> {
        self.as_reservable()
            .ok_or_else(|| QueueError::unsupported("delete", self.backend_name()))?
            .delete(message_id, subscriber_id)
    }

    fn release(
        &self,
        message_id: &MessageId,
        subscriber_id: Option<&SubscriberId>,
    ) -> Result<(), QueueError> {
        self.as_reservable()
            .ok_or_else(|| QueueError::unsupported("release", self.backend_name()))?
            .release(message_id, subscriber_id)
    }

    fn subscribe(
        &self,
        subscriber_id: &SubscriberId,
        label: Option<&str>,
        categories: &[String],
        exceptions: &[String],
    ) -> Result<(), QueueError> {
        self.as_subscribable()
            .ok_or_else(|| QueueError::unsupported("subscribe", self.backend_name()))?
            .subscribe(subscriber_id, label, categories, exceptions)
    }

    fn unsubscribe(&self, subscriber_id: &SubscriberId, permanent: bool) -> Result<(), QueueError> {
        self.as_subscribable()
            .ok_or_else(|| QueueError::unsupported("unsubscribe", self.backend_name()))?
            .unsubscribe(subscriber_id, permanent)
    }

    fn is_subscribed(&self, subscriber_id: &SubscriberId) -> Result<bool, QueueError> {
        self.as_subscribable()
            .ok_or_else(|| QueueError::unsupported("is_subscribed", self.backend_name()))?
            .is_subscribed(subscriber_id)
    }
}

impl<T: QueueBackend + ?Sized> QueueContract for T {}
