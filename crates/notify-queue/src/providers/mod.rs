//! Queue backend implementations.
//!
//! This module contains concrete implementations of the `QueueBackend`
//! trait for different transports.

pub mod sysv;

pub use sysv::SysVQueueBackend;
