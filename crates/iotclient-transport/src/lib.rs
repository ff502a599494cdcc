//! Channel bindings for the IoT hub client.
//!
//! Two kinds of host channel carry a message:
//! - a bounded, size-limited message queue for header frames (and, inbound,
//!   for whole hub-to-device messages)
//! - a per-process named FIFO that carries message bodies of any size
//!
//! The queue side is reached through the [`ControlChannel`] and
//! [`InboundChannel`] traits so callers can substitute their own channels.

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod fifo;
#[cfg(target_os = "linux")]
pub mod mqueue;

pub use error::{Result, TransportError};
pub use traits::{ControlChannel, InboundChannel};

#[cfg(unix)]
pub use fifo::{BodyFifo, StreamReport, DEFAULT_BLOCK_SIZE};
#[cfg(target_os = "linux")]
pub use mqueue::MessageQueue;
