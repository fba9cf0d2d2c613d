//! Error types for queue operations.

use chrono::Duration;
use thiserror::Error;

/// Comprehensive error type for all queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Operation '{operation}' is not supported by the {backend} backend")]
    Unsupported {
        operation: &'static str,
        backend: String,
    },

    #[error("Queue {queue} is full")]
    CapacityExceeded { queue: String },

    #[error("Transport failure during {operation}: {message} (os error {code})")]
    TransportFailure {
        operation: &'static str,
        code: i32,
        message: String,
    },

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl QueueError {
    /// Build an unsupported-operation error for the named backend
    pub fn unsupported(operation: &'static str, backend: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            backend: backend.into(),
        }
    }

    /// Check if error is an operational condition the caller may retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::Unsupported { .. } => false,
            Self::CapacityExceeded { .. } => true,
            Self::TransportFailure { .. } => true,
            Self::MessageTooLarge { .. } => false,
            Self::Serialization(_) => false,
            Self::Validation(_) => false,
        }
    }

    /// Check if error should be retried
    pub fn should_retry(&self) -> bool {
        self.is_transient()
    }

    /// Get suggested retry delay. The queue never retries on its own.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CapacityExceeded { .. } => Some(Duration::seconds(1)),
            Self::TransportFailure { .. } => Some(Duration::seconds(5)),
            _ => None,
        }
    }
}

/// Errors during message serialization/deserialization
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Queue id must be exactly one ASCII character, got {length} characters in '{id}'")]
    InvalidQueueId { id: String, length: usize },

    #[error("Cannot derive queue key from '{path}': {message}")]
    KeyDerivation { path: String, message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
