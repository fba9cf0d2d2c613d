//! System V message queue primitives.
//!
//! Wraps `ftok`, `msgget`, `msgsnd`, `msgrcv` and `msgctl` behind safe
//! functions. Every message travels in a fixed-size envelope of
//! [`ENVELOPE_CAPACITY`] payload bytes preceded by the message type.

use crate::error::ConfigurationError;
use crate::message::QueueId;
use serde::Serialize;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use thiserror::Error;

#[cfg(test)]
#[path = "native_tests.rs"]
mod tests;

/// Payload bytes carried by one envelope
pub const ENVELOPE_CAPACITY: usize = 1024;

/// Failures reported by the native queue
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("queue has no room for the message")]
    Full,

    #[error("interrupted while waiting for a message")]
    Interrupted,

    #[error("payload of {size} bytes exceeds envelope capacity {max_size}")]
    TooLarge { size: usize, max_size: usize },

    #[error("{operation} failed: {source}")]
    Os {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl NativeError {
    fn last(operation: &'static str) -> Self {
        Self::Os {
            operation,
            source: io::Error::last_os_error(),
        }
    }

    /// OS error number behind this failure, or 0 when there is none
    pub fn code(&self) -> i32 {
        match self {
            Self::Full => libc::EAGAIN,
            Self::Interrupted => libc::EINTR,
            Self::TooLarge { .. } => libc::E2BIG,
            Self::Os { source, .. } => source.raw_os_error().unwrap_or(0),
        }
    }
}

/// Numeric key naming a native queue across processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueueKey(i32);

impl QueueKey {
    /// Derive the key for `id` from a stable filesystem location.
    ///
    /// The key depends only on the location's device and inode and on the id
    /// byte, so every process using the same location and id gets the same key.
    pub fn derive(location: &Path, id: QueueId) -> Result<Self, ConfigurationError> {
        let path = CString::new(location.as_os_str().as_bytes()).map_err(|_| {
            ConfigurationError::KeyDerivation {
                path: location.display().to_string(),
                message: "path contains a NUL byte".to_string(),
            }
        })?;

        sys::ftok(&path, id.as_byte())
            .map(Self)
            .map_err(|e| ConfigurationError::KeyDerivation {
                path: location.display().to_string(),
                message: e.to_string(),
            })
    }

    pub fn from_raw(key: i32) -> Self {
        Self(key)
    }

    pub fn as_raw(&self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for QueueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Kernel bookkeeping for a native queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Messages currently waiting
    pub messages: u64,
    /// Byte capacity of the queue
    pub max_bytes: u64,
    pub last_send_pid: i32,
    pub last_receive_pid: i32,
}

/// Handle to an open native queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeQueue {
    id: i32,
}

impl NativeQueue {
    /// Create the queue for `key`, or attach to it when it already exists
    pub fn open(key: QueueKey, permissions: u32) -> Result<Self, NativeError> {
        let id = sys::msgget(key.as_raw(), permissions)?;
        Ok(Self { id })
    }

    /// Kernel identifier of the queue
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Enqueue one payload. Without `wait` a full queue yields [`NativeError::Full`].
    pub fn send(&self, message_type: i64, payload: &[u8], wait: bool) -> Result<(), NativeError> {
        if payload.len() > ENVELOPE_CAPACITY {
            return Err(NativeError::TooLarge {
                size: payload.len(),
                max_size: ENVELOPE_CAPACITY,
            });
        }
        sys::msgsnd(self.id, message_type, payload, wait)
    }

    /// Dequeue the oldest payload of any type.
    ///
    /// Without `wait` an empty queue yields `Ok(None)`. Payloads longer than
    /// `max_size` are refused by the kernel and stay in the queue.
    pub fn receive(&self, max_size: usize, wait: bool) -> Result<Option<Vec<u8>>, NativeError> {
        sys::msgrcv(self.id, max_size.min(ENVELOPE_CAPACITY), wait)
    }

    pub fn stats(&self) -> Result<QueueStats, NativeError> {
        sys::msgctl_stat(self.id)
    }

    /// Destroy the queue. Blocked receivers wake with an error.
    pub fn remove(&self) -> Result<(), NativeError> {
        sys::msgctl_remove(self.id)
    }
}

#[cfg(target_os = "linux")]
mod sys {
    use super::{NativeError, QueueStats, ENVELOPE_CAPACITY};
    use std::ffi::CStr;

    #[repr(C)]
    struct Envelope {
        mtype: libc::c_long,
        mtext: [u8; ENVELOPE_CAPACITY],
    }

    impl Envelope {
        fn empty() -> Self {
            Self {
                mtype: 0,
                mtext: [0; ENVELOPE_CAPACITY],
            }
        }
    }

    pub fn ftok(path: &CStr, project: u8) -> std::io::Result<i32> {
        let key = unsafe { libc::ftok(path.as_ptr(), libc::c_int::from(project)) };
        if key == -1 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(key)
    }

    pub fn msgget(key: i32, permissions: u32) -> Result<i32, NativeError> {
        let flags = libc::IPC_CREAT | (permissions & 0o777) as libc::c_int;
        let id = unsafe { libc::msgget(key, flags) };
        if id == -1 {
            return Err(NativeError::last("msgget"));
        }
        Ok(id)
    }

    pub fn msgsnd(id: i32, message_type: i64, payload: &[u8], wait: bool) -> Result<(), NativeError> {
        let mut envelope = Envelope::empty();
        envelope.mtype = message_type as libc::c_long;
        envelope.mtext[..payload.len()].copy_from_slice(payload);

        let flags = if wait { 0 } else { libc::IPC_NOWAIT };
        let rc = unsafe {
            libc::msgsnd(
                id,
                &envelope as *const Envelope as *const libc::c_void,
                payload.len(),
                flags,
            )
        };
        if rc == -1 {
            let err = std::io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::EAGAIN) => NativeError::Full,
                Some(libc::EINTR) => NativeError::Interrupted,
                _ => NativeError::Os {
                    operation: "msgsnd",
                    source: err,
                },
            });
        }
        Ok(())
    }

    pub fn msgrcv(id: i32, max_size: usize, wait: bool) -> Result<Option<Vec<u8>>, NativeError> {
        let mut envelope = Envelope::empty();
        let flags = if wait { 0 } else { libc::IPC_NOWAIT };
        let received = unsafe {
            libc::msgrcv(
                id,
                &mut envelope as *mut Envelope as *mut libc::c_void,
                max_size,
                0,
                flags,
            )
        };
        if received < 0 {
            let err = std::io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::ENOMSG) => Ok(None),
                Some(libc::EINTR) => Err(NativeError::Interrupted),
                _ => Err(NativeError::Os {
                    operation: "msgrcv",
                    source: err,
                }),
            };
        }
        Ok(Some(envelope.mtext[..received as usize].to_vec()))
    }

    pub fn msgctl_stat(id: i32) -> Result<QueueStats, NativeError> {
        let mut ds: libc::msqid_ds = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::msgctl(id, libc::IPC_STAT, &mut ds) };
        if rc == -1 {
            return Err(NativeError::last("msgctl(IPC_STAT)"));
        }
        Ok(QueueStats {
            messages: ds.msg_qnum as u64,
            max_bytes: ds.msg_qbytes as u64,
            last_send_pid: ds.msg_lspid,
            last_receive_pid: ds.msg_lrpid,
        })
    }

    pub fn msgctl_remove(id: i32) -> Result<(), NativeError> {
        let rc = unsafe { libc::msgctl(id, libc::IPC_RMID, std::ptr::null_mut()) };
        if rc == -1 {
            return Err(NativeError::last("msgctl(IPC_RMID)"));
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod sys {
    use super::{NativeError, QueueStats};
    use std::ffi::CStr;
    use std::io;

    fn unsupported() -> io::Error {
        io::Error::new(
            io::ErrorKind::Unsupported,
            "System V message queues only supported on Linux",
        )
    }

    fn unsupported_op(operation: &'static str) -> NativeError {
        NativeError::Os {
            operation,
            source: unsupported(),
        }
    }

    pub fn ftok(_path: &CStr, _project: u8) -> io::Result<i32> {
        Err(unsupported())
    }

    pub fn msgget(_key: i32, _permissions: u32) -> Result<i32, NativeError> {
        Err(unsupported_op("msgget"))
    }

    pub fn msgsnd(_id: i32, _type: i64, _payload: &[u8], _wait: bool) -> Result<(), NativeError> {
        Err(unsupported_op("msgsnd"))
    }

    pub fn msgrcv(_id: i32, _max: usize, _wait: bool) -> Result<Option<Vec<u8>>, NativeError> {
        Err(unsupported_op("msgrcv"))
    }

    pub fn msgctl_stat(_id: i32) -> Result<QueueStats, NativeError> {
        Err(unsupported_op("msgctl(IPC_STAT)"))
    }

    pub fn msgctl_remove(_id: i32) -> Result<(), NativeError> {
        Err(unsupported_op("msgctl(IPC_RMID)"))
    }
}
