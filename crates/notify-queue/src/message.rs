//! Message types for queue operations including core domain identifiers.

use crate::error::{ConfigurationError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Single-character identity of a native queue.
///
/// The character is the project id fed into the key derivation, so it must
/// fit in one byte: exactly one ASCII character other than NUL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QueueId(char);

impl QueueId {
    /// Create new queue id with validation
    pub fn new(id: &str) -> Result<Self, ConfigurationError> {
        let mut chars = id.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() && c != '\0' => Ok(Self(c)),
            _ => Err(ConfigurationError::InvalidQueueId {
                id: id.to_string(),
                length: id.chars().count(),
            }),
        }
    }

    /// Get the id character
    pub fn as_char(&self) -> char {
        self.0
    }

    /// Get the id as the byte used for key derivation
    pub fn as_byte(&self) -> u8 {
        self.0 as u8
    }
}

impl std::fmt::Display for QueueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueId {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for QueueId {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<QueueId> for String {
    fn from(value: QueueId) -> Self {
        value.0.to_string()
    }
}

/// Identifier assigned to a message by a backend that tracks messages
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Identity of a consumer registered with a subscription-capable backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(String);

impl SubscriberId {
    /// Create new subscriber ID with validation
    pub fn new(id: String) -> Result<Self, ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::Required {
                field: "subscriber_id".to_string(),
            });
        }

        if id.len() > 128 {
            return Err(ValidationError::OutOfRange {
                field: "subscriber_id".to_string(),
                message: "maximum 128 characters".to_string(),
            });
        }

        // Validate ASCII printable characters only
        if !id.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(ValidationError::InvalidFormat {
                field: "subscriber_id".to_string(),
                message: "only ASCII printable characters allowed".to_string(),
            });
        }

        Ok(Self(id))
    }

    /// Get subscriber ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubscriberId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get underlying DateTime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = s.parse::<DateTime<Utc>>()?;
        Ok(Self::from_datetime(dt))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Delivery state of a message in a backend that tracks reservations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Available,
    Reserved,
    Deleted,
}

/// A notification message as stored in and transported by a queue.
///
/// The JSON form of this record is the payload written to the native queue,
/// so every byte counts against the transport limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub created_on: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl MessageRecord {
    /// Create new record stamped with the given creation time
    pub fn new(body: impl Into<String>, created_on: Timestamp) -> Self {
        Self {
            id: None,
            created_on,
            sender_id: None,
            body: body.into(),
            category: None,
        }
    }

    /// Set the producer identity
    pub fn with_sender_id(mut self, sender_id: Option<String>) -> Self {
        self.sender_id = sender_id;
        self
    }

    /// Set the classification tag
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// Encode the record into its wire payload
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a record from a wire payload
    pub fn from_payload(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }
}

/// How many messages a receive call removes and how it waits for them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveLimit {
    /// Wait indefinitely for exactly one message
    Blocking,
    /// Remove every currently available message without waiting
    Drain,
    /// Remove at most this many available messages without waiting
    UpTo(u32),
}

impl ReceiveLimit {
    /// Map the raw contract value: `None` blocks, `-1` drains, `N >= 0` bounds
    pub fn from_raw(limit: Option<i64>) -> Result<Self, ValidationError> {
        match limit {
            None => Ok(Self::Blocking),
            Some(-1) => Ok(Self::Drain),
            Some(n) if n >= 0 => u32::try_from(n).map(Self::UpTo).map_err(|_| {
                ValidationError::OutOfRange {
                    field: "limit".to_string(),
                    message: format!("maximum {}", u32::MAX),
                }
            }),
            Some(n) => Err(ValidationError::OutOfRange {
                field: "limit".to_string(),
                message: format!("{} is neither -1 nor a non-negative count", n),
            }),
        }
    }

    /// Check if this limit waits for a message
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocking)
    }
}

/// Result of a send that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The record was handed to the transport
    Sent,
    /// The guard hook suppressed the send
    Cancelled,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
