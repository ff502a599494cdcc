use std::time::Duration;

use bytes::Bytes;
use iotclient_frame::{find_header_end, get_property, split_frame_at, FrameError, Headers};
use iotclient_transport::{InboundChannel, TransportError};
use tracing::debug;

use crate::config::ReceiverConfig;
use crate::error::{ClientError, Result};

/// A hub-to-device message, borrowed from the receiver's buffer.
///
/// Valid until the next receive on the same receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Message<'a> {
    /// Header block, without the terminating empty line. `None` when the
    /// message carried no empty line.
    pub headers: Option<&'a [u8]>,
    /// Body bytes. `None` when nothing followed the header block.
    pub body: Option<&'a [u8]>,
}

impl<'a> Message<'a> {
    /// Header block as text, if present and valid UTF-8.
    pub fn headers_str(&self) -> Option<&'a str> {
        self.headers.and_then(|h| std::str::from_utf8(h).ok())
    }

    /// Look up one header value.
    pub fn property(&self, name: &str) -> Result<&'a str> {
        let Some(raw) = self.headers else {
            return Err(FrameError::NotFound(name.to_string()).into());
        };
        let text = std::str::from_utf8(raw)
            .map_err(|_| FrameError::InvalidHeader("header block is not UTF-8".to_string()))?;
        Ok(get_property(text, name)?)
    }

    /// Parse the header block. A message without headers yields an empty set.
    pub fn parse_headers(&self) -> Result<Headers> {
        match self.headers {
            None => Ok(Headers::new()),
            Some(raw) => {
                let text = std::str::from_utf8(raw).map_err(|_| {
                    FrameError::InvalidHeader("header block is not UTF-8".to_string())
                })?;
                Ok(Headers::parse(text)?)
            }
        }
    }

    /// Copy the message out of the receive buffer.
    pub fn into_owned(self) -> OwnedMessage {
        OwnedMessage {
            headers: self.headers.map(Bytes::copy_from_slice),
            body: self.body.map(Bytes::copy_from_slice),
        }
    }
}

/// A received message that outlives the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OwnedMessage {
    pub headers: Option<Bytes>,
    pub body: Option<Bytes>,
}

impl OwnedMessage {
    pub fn as_message(&self) -> Message<'_> {
        Message {
            headers: self.headers.as_deref(),
            body: self.body.as_deref(),
        }
    }
}

/// Owns an inbound channel and the single buffer messages are received into.
pub struct Receiver {
    channel: Box<dyn InboundChannel + Send>,
    buf: Vec<u8>,
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("buffer_size", &self.buffer_size())
            .finish_non_exhaustive()
    }
}

impl Receiver {
    /// Create (or open) the named inbound queue and its receive buffer.
    ///
    /// The buffer is allocated before the queue is touched, so an allocation
    /// failure leaves no queue behind.
    #[cfg(target_os = "linux")]
    pub fn create(config: &ReceiverConfig) -> Result<Self> {
        use iotclient_transport::MessageQueue;

        if config.name.trim_start_matches('/').is_empty() {
            return Err(ClientError::InvalidArgument("receiver name must not be empty"));
        }
        if config.max_messages == 0 {
            return Err(ClientError::InvalidArgument("max_messages must be non-zero"));
        }
        if config.max_message_size == 0 {
            return Err(ClientError::InvalidArgument("max_message_size must be non-zero"));
        }

        let buf = alloc_buffer(config.max_message_size)?;
        let queue = MessageQueue::create_reader(
            &config.name,
            config.max_messages,
            config.max_message_size,
        )?;
        debug!(
            name = queue.name(),
            max_messages = queue.max_messages(),
            max_message_size = queue.max_message_size(),
            "receiver queue ready"
        );
        Self::with_buffer(Box::new(queue), buf)
    }

    /// Wrap an existing inbound channel with a buffer of at least `buffer_size` bytes.
    pub fn from_channel(
        channel: impl InboundChannel + Send + 'static,
        buffer_size: usize,
    ) -> Result<Self> {
        let buf = alloc_buffer(buffer_size)?;
        Self::with_buffer(Box::new(channel), buf)
    }

    // An existing queue may have been created with a larger message size
    // than requested; the buffer grows to match so no receive can fail with
    // EMSGSIZE.
    fn with_buffer(channel: Box<dyn InboundChannel + Send>, mut buf: Vec<u8>) -> Result<Self> {
        let needed = channel.max_message_size() + 1;
        if buf.len() < needed {
            buf = alloc_buffer(channel.max_message_size())?;
        }
        Ok(Self { channel, buf })
    }

    /// Largest message this receiver can hold.
    pub fn buffer_size(&self) -> usize {
        self.buf.len() - 1
    }

    /// Block until a message arrives, optionally giving up after `timeout`.
    ///
    /// The returned views point into the receiver's buffer. The first byte of
    /// the header terminator and the byte after the message are zeroed, so
    /// both views are also NUL-terminated in memory.
    pub fn receive(&mut self, timeout: Option<Duration>) -> Result<Message<'_>> {
        let capacity = self.buf.len() - 1;
        let len = self.channel.receive(&mut self.buf[..capacity], timeout)?;
        if len > capacity {
            return Err(TransportError::MessageTooLarge {
                size: len,
                max: capacity,
            }
            .into());
        }
        self.buf[len] = 0;

        let header_end = find_header_end(&self.buf[..len]);
        if let Some(end) = header_end {
            self.buf[end] = 0;
        }
        debug!(bytes = len, has_headers = header_end.is_some(), "received message");

        let parts = split_frame_at(&self.buf[..len], header_end);
        Ok(Message {
            headers: parts.headers,
            body: parts.body,
        })
    }
}

/// Zeroed buffer of `size` bytes plus one for a trailing NUL.
pub(crate) fn alloc_buffer(size: usize) -> Result<Vec<u8>> {
    let requested = size
        .checked_add(1)
        .ok_or(ClientError::OutOfMemory { requested: size })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(requested)
        .map_err(|_| ClientError::OutOfMemory { requested })?;
    buf.resize(requested, 0);
    Ok(buf)
}
