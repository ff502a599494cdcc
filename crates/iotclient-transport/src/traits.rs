use std::time::Duration;

use crate::error::Result;

/// Outbound, size-bounded message channel that header frames are written to.
///
/// Every client in the system shares one such channel with the hub, so an
/// implementation must deliver each `send` as a single atomic message.
pub trait ControlChannel {
    /// Largest message the channel accepts, in bytes.
    fn max_message_size(&self) -> usize;

    /// Deliver one message.
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// Inbound, size-bounded message channel the hub writes device messages to.
pub trait InboundChannel {
    /// Largest message the channel can deliver, in bytes.
    ///
    /// Receive buffers must be at least this large.
    fn max_message_size(&self) -> usize;

    /// Block until one message arrives and copy it into `buf`.
    ///
    /// With `timeout` set the wait gives up with an
    /// [`std::io::ErrorKind::TimedOut`] I/O error once it elapses.
    /// Returns the message length.
    fn receive(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize>;
}

impl<T: ControlChannel + ?Sized> ControlChannel for Box<T> {
    fn max_message_size(&self) -> usize {
        (**self).max_message_size()
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        (**self).send(message)
    }
}

impl<T: InboundChannel + ?Sized> InboundChannel for Box<T> {
    fn max_message_size(&self) -> usize {
        (**self).max_message_size()
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        (**self).receive(buf, timeout)
    }
}
