//! Backend configuration and construction.

use crate::contract::QueueBackend;
use crate::error::{ConfigurationError, QueueError};
use crate::hooks::QueueDependencies;
use crate::message::QueueId;
use crate::providers::SysVQueueBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Permission bits for newly created native queues
pub const DEFAULT_PERMISSIONS: u32 = 0o666;

/// Location the native key is derived from unless configured otherwise.
///
/// A fixed path, not the per-process temp dir, so every process using the
/// same id reaches the same queue.
pub const DEFAULT_KEY_PATH: &str = "/tmp";

/// Enumeration of supported queue backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    SystemV,
}

impl BackendType {
    /// Get maximum wire payload size for backend
    pub fn max_message_size(&self) -> usize {
        match self {
            Self::SystemV => crate::providers::sysv::MSG_MAXSIZE,
        }
    }
}

/// Backend-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    SystemV(SysVQueueConfig),
}

impl BackendConfig {
    pub fn backend_type(&self) -> BackendType {
        match self {
            Self::SystemV(_) => BackendType::SystemV,
        }
    }
}

/// System V message queue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SysVQueueConfig {
    /// One-character queue identity
    pub id: String,
    /// Logical name used in logs and errors
    pub name: String,
    /// Existing filesystem location the native key is derived from
    pub key_path: PathBuf,
    /// Permission bits applied when the queue is created
    pub permissions: u32,
}

impl Default for SysVQueueConfig {
    fn default() -> Self {
        Self {
            id: "n".to_string(),
            name: "notifications".to_string(),
            key_path: PathBuf::from(DEFAULT_KEY_PATH),
            permissions: DEFAULT_PERMISSIONS,
        }
    }
}

impl SysVQueueConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_key_path(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.key_path = key_path.into();
        self
    }

    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Check the settings without touching the filesystem or the kernel
    pub fn validate(&self) -> Result<QueueId, ConfigurationError> {
        let id = QueueId::new(&self.id)?;

        if self.name.is_empty() {
            return Err(ConfigurationError::Missing {
                key: "name".to_string(),
            });
        }

        if self.permissions > 0o777 {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "permissions {:o} exceed the 0o777 permission bits",
                    self.permissions
                ),
            });
        }

        Ok(id)
    }
}

/// Factory for creating queue backends from configuration
pub struct QueueFactory;

impl QueueFactory {
    /// Create a backend from configuration
    pub fn create(
        config: BackendConfig,
        deps: QueueDependencies,
    ) -> Result<Box<dyn QueueBackend>, QueueError> {
        let backend: Box<dyn QueueBackend> = match config {
            BackendConfig::SystemV(sysv_config) => {
                Box::new(SysVQueueBackend::new(sysv_config, deps)?)
            }
        };
        Ok(backend)
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
