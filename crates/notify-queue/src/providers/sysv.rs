//! System V message queue backend.
//!
//! Stores notification records directly in a kernel message queue:
//! - Sends never block; a full queue is reported as `CapacityExceeded`
//! - Receives remove messages permanently (competing consumers)
//! - A blocking receive waits indefinitely for a single message
//!
//! The transport has no non-destructive read, no acknowledgement state and
//! no subscriber registry, so this backend advertises none of the optional
//! capabilities.

use crate::contract::{MessageReceiver, MessageSender, QueueBackend};
use crate::error::{QueueError, SerializationError};
use crate::hooks::{QueueDependencies, QueueEvent};
use crate::message::{MessageRecord, QueueId, ReceiveLimit, SendOutcome, SubscriberId};
use crate::native::{NativeError, NativeQueue, QueueKey, QueueStats, ENVELOPE_CAPACITY};
use crate::provider::SysVQueueConfig;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing::{debug, info};

#[cfg(test)]
#[path = "sysv_tests.rs"]
mod tests;

/// Largest serialized record the transport carries
pub const MSG_MAXSIZE: usize = ENVELOPE_CAPACITY;

/// Message type attached to every record this backend writes
pub const MESSAGE_TYPE: i64 = 1;

const BACKEND_NAME: &str = "sysv";

// ============================================================================
// SysVQueueBackend
// ============================================================================

/// Queue backend on top of a System V message queue
#[derive(Debug)]
pub struct SysVQueueBackend {
    name: String,
    id: QueueId,
    key: QueueKey,
    permissions: u32,
    handle: OnceLock<NativeQueue>,
    init_guard: Mutex<()>,
    deps: QueueDependencies,
}

impl SysVQueueBackend {
    /// Validate the configuration and derive the native key.
    ///
    /// No native queue is created or attached here; that happens on the
    /// first operation that needs one.
    pub fn new(config: SysVQueueConfig, deps: QueueDependencies) -> Result<Self, QueueError> {
        let id = config.validate()?;
        let key = QueueKey::derive(&config.key_path, id)?;

        debug!(
            queue = %config.name,
            id = %id,
            key = %key,
            key_path = %config.key_path.display(),
            "Configured System V queue"
        );

        Ok(Self {
            name: config.name,
            id,
            key,
            permissions: config.permissions,
            handle: OnceLock::new(),
            init_guard: Mutex::new(()),
            deps,
        })
    }

    pub fn queue_id(&self) -> QueueId {
        self.id
    }

    /// Native key shared by every process that uses the same id and key path
    pub fn key(&self) -> QueueKey {
        self.key
    }

    /// Check whether the native queue has been acquired yet
    pub fn is_attached(&self) -> bool {
        self.handle.get().is_some()
    }

    /// Kernel identifier of the native queue, acquiring it if needed
    pub fn resource_id(&self) -> Result<i32, QueueError> {
        Ok(self.queue()?.id())
    }

    /// Kernel bookkeeping for the native queue, acquiring it if needed
    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let queue = self.queue()?;
        queue
            .stats()
            .map_err(|e| self.transport_error("msgctl(IPC_STAT)", e))
    }

    /// Destroy the native queue and every message in it.
    ///
    /// Other processes attached to the same key lose the queue as well;
    /// a consumer blocked in receive wakes with a transport failure.
    pub fn remove(self) -> Result<(), QueueError> {
        let queue = self.queue()?;
        queue
            .remove()
            .map_err(|e| self.transport_error("msgctl(IPC_RMID)", e))?;
        info!(queue = %self.name, key = %self.key, "Removed System V queue");
        Ok(())
    }

    /// Acquire the native queue once and reuse it afterwards
    fn queue(&self) -> Result<NativeQueue, QueueError> {
        if let Some(queue) = self.handle.get() {
            return Ok(*queue);
        }

        let _guard = self
            .init_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(queue) = self.handle.get() {
            return Ok(*queue);
        }

        let queue = NativeQueue::open(self.key, self.permissions)
            .map_err(|e| self.transport_error("msgget", e))?;
        debug!(
            queue = %self.name,
            key = %self.key,
            resource_id = queue.id(),
            permissions = %format!("{:o}", self.permissions),
            "Attached to System V queue"
        );

        Ok(*self.handle.get_or_init(|| queue))
    }

    fn transport_error(&self, operation: &'static str, err: NativeError) -> QueueError {
        match err {
            NativeError::Full => QueueError::CapacityExceeded {
                queue: self.name.clone(),
            },
            NativeError::TooLarge { size, max_size } => {
                QueueError::MessageTooLarge { size, max_size }
            }
            other => QueueError::TransportFailure {
                operation,
                code: other.code(),
                message: other.to_string(),
            },
        }
    }

    fn report_send_failure(&self, record: &MessageRecord, err: &QueueError) {
        let sink = &self.deps.log_sink;
        sink.record(&QueueEvent::SendFailed {
            queue: self.name.clone(),
            body: record.body.clone(),
            reason: err.to_string(),
        });
        if matches!(err, QueueError::CapacityExceeded { .. }) {
            sink.record(&QueueEvent::QueueFull {
                queue: self.name.clone(),
            });
        }
    }

    fn report_receive_failure(&self, err: &QueueError) {
        self.deps.log_sink.record(&QueueEvent::ReceiveFailed {
            queue: self.name.clone(),
            reason: err.to_string(),
        });
    }

    /// Decode a removed entry; undecodable entries are reported and dropped
    fn decode(&self, payload: &[u8]) -> Option<MessageRecord> {
        match MessageRecord::from_payload(payload) {
            Ok(record) => Some(record),
            Err(e) => {
                self.deps.log_sink.record(&QueueEvent::MalformedEntry {
                    queue: self.name.clone(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    fn write(&self, payload: &[u8]) -> Result<(), QueueError> {
        if payload.len() > MSG_MAXSIZE {
            return Err(QueueError::MessageTooLarge {
                size: payload.len(),
                max_size: MSG_MAXSIZE,
            });
        }

        let queue = self.queue()?;
        queue
            .send(MESSAGE_TYPE, payload, false)
            .map_err(|e| self.transport_error("msgsnd", e))
    }

    fn receive_blocking(&self, queue: NativeQueue) -> Result<Vec<MessageRecord>, QueueError> {
        match queue.receive(MSG_MAXSIZE, true) {
            Ok(Some(payload)) => Ok(self.decode(&payload).into_iter().collect()),
            Ok(None) => Ok(Vec::new()),
            Err(NativeError::Interrupted) => {
                debug!(queue = %self.name, "Blocking receive interrupted");
                Ok(Vec::new())
            }
            Err(e) => {
                let err = self.transport_error("msgrcv", e);
                self.report_receive_failure(&err);
                Err(err)
            }
        }
    }

    fn receive_available(
        &self,
        queue: NativeQueue,
        max_reads: Option<u32>,
    ) -> Result<Vec<MessageRecord>, QueueError> {
        let mut records = Vec::new();
        let mut reads: u32 = 0;

        while max_reads.map_or(true, |max| reads < max) {
            match queue.receive(MSG_MAXSIZE, false) {
                Ok(Some(payload)) => {
                    reads += 1;
                    records.extend(self.decode(&payload));
                }
                Ok(None) | Err(NativeError::Interrupted) => break,
                Err(e) => {
                    let err = self.transport_error("msgrcv", e);
                    self.report_receive_failure(&err);
                    // Records already read are gone from the queue; hand them over.
                    if records.is_empty() {
                        return Err(err);
                    }
                    break;
                }
            }
        }

        debug!(queue = %self.name, reads = reads, received = records.len(), "Received from queue");
        Ok(records)
    }
}

impl MessageSender for SysVQueueBackend {
    fn send(&self, body: &str, category: Option<&str>) -> Result<SendOutcome, QueueError> {
        let record = self.deps.build_record(body, category);

        if !self.deps.builder.before_send(&record) {
            self.deps.log_sink.record(&QueueEvent::SendCancelled {
                queue: self.name.clone(),
                body: record.body.clone(),
            });
            return Ok(SendOutcome::Cancelled);
        }

        let payload = record.to_payload().map_err(SerializationError::from)?;
        if let Err(err) = self.write(&payload) {
            self.report_send_failure(&record, &err);
            return Err(err);
        }

        self.deps.builder.after_send(&record);
        self.deps.log_sink.record(&QueueEvent::Sent {
            queue: self.name.clone(),
            body: record.body,
        });
        Ok(SendOutcome::Sent)
    }
}

impl MessageReceiver for SysVQueueBackend {
    fn receive(
        &self,
        subscriber_id: Option<&SubscriberId>,
        limit: ReceiveLimit,
    ) -> Result<Vec<MessageRecord>, QueueError> {
        if subscriber_id.is_some() {
            return Err(QueueError::unsupported("receive for a subscriber", BACKEND_NAME));
        }

        if limit == ReceiveLimit::UpTo(0) {
            return Ok(Vec::new());
        }

        let queue = self.queue().inspect_err(|err| self.report_receive_failure(err))?;

        match limit {
            ReceiveLimit::Blocking => self.receive_blocking(queue),
            ReceiveLimit::Drain => self.receive_available(queue, None),
            ReceiveLimit::UpTo(max) => self.receive_available(queue, Some(max)),
        }
    }
}

impl QueueBackend for SysVQueueBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn queue_name(&self) -> &str {
        &self.name
    }

    fn max_message_size(&self) -> usize {
        MSG_MAXSIZE
    }
}
