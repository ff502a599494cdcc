use std::io::Read;
use std::path::Path;
use std::time::Duration;

use iotclient_frame::{encode_frame, FRAME_PREFIX_SIZE};
use iotclient_transport::{BodyFifo, ControlChannel, StreamReport};
use tracing::{debug, info};

use crate::config::{ClientConfig, ReceiverConfig};
use crate::error::{ClientError, Result};
use crate::receiver::{Message, Receiver};

// Per-operation events go to INFO when the client is verbose, DEBUG otherwise.
macro_rules! lifecycle {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// Device-side connection to the IoT hub.
///
/// Owns the control channel, the per-process body FIFO and, once created,
/// an inbound receiver. Everything is released by [`Client::close`] or on drop.
///
/// A client is not internally synchronized; share it across threads behind a
/// `Mutex` if needed.
pub struct Client {
    control: Option<Box<dyn ControlChannel + Send>>,
    tx_buf: Vec<u8>,
    fifo: Option<BodyFifo>,
    receiver: Option<Receiver>,
    token: u32,
    config: ClientConfig,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("token", &self.token)
            .field("stream_path", &self.stream_path())
            .field("has_receiver", &self.has_receiver())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect to the hub with default settings.
    #[cfg(target_os = "linux")]
    pub fn create() -> Result<Self> {
        Self::create_with_config(ClientConfig::default())
    }

    /// Connect to the hub's control queue named in `config`.
    ///
    /// Fails if the hub queue does not exist or the body FIFO cannot be
    /// created. Nothing acquired before the failure is left behind.
    #[cfg(target_os = "linux")]
    pub fn create_with_config(config: ClientConfig) -> Result<Self> {
        let control = iotclient_transport::MessageQueue::open_writer(&config.hub_queue)?;
        Self::with_control_channel(control, config)
    }

    /// Build a client on top of an already opened control channel.
    pub fn with_control_channel(
        control: impl ControlChannel + Send + 'static,
        config: ClientConfig,
    ) -> Result<Self> {
        if config.stream_block_size == 0 {
            return Err(ClientError::InvalidArgument("stream_block_size must be non-zero"));
        }
        let max_message_size = control.max_message_size();
        if max_message_size <= FRAME_PREFIX_SIZE {
            return Err(ClientError::InvalidArgument(
                "control channel message size cannot hold a frame",
            ));
        }

        let mut tx_buf = Vec::new();
        tx_buf
            .try_reserve_exact(max_message_size)
            .map_err(|_| ClientError::OutOfMemory {
                requested: max_message_size,
            })?;

        let token = std::process::id();
        let fifo = BodyFifo::create(&config.stream_root, token)?;

        lifecycle!(
            config.verbose,
            token,
            max_message_size,
            path = ?fifo.path(),
            "client connected"
        );
        Ok(Self {
            control: Some(Box::new(control)),
            tx_buf,
            fifo: Some(fifo),
            receiver: None,
            token,
            config,
        })
    }

    /// Send one message: the header block on the control channel, then the
    /// body on the body stream.
    ///
    /// Blocks until the hub opens the body stream. An empty `body` still
    /// opens and closes the stream. The FIFO carries no framing of its own:
    /// a body ends at EOF, so the hub must drain each body to EOF and close
    /// its read end before the next `send` or `stream`, or the next body
    /// runs into the previous one.
    pub fn send(&mut self, headers: &str, body: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let max = self.config.effective_max_body_size();
        if body.len() > max {
            return Err(ClientError::BodyTooLarge {
                size: body.len(),
                max,
            });
        }

        self.send_headers(headers)?;
        self.fifo()?.write_body(body)?;
        lifecycle!(
            self.config.verbose,
            header_bytes = headers.len(),
            body_bytes = body.len(),
            "sent message"
        );
        Ok(())
    }

    /// Send a header block, then forward `source` as the body until it is
    /// exhausted.
    ///
    /// A body longer than the size ceiling is cut at the ceiling; the report
    /// says so.
    pub fn stream<R: Read + ?Sized>(
        &mut self,
        headers: &str,
        source: &mut R,
    ) -> Result<StreamReport> {
        self.ensure_open()?;
        self.send_headers(headers)?;

        let limit = self.config.effective_max_body_size() as u64;
        let block_size = self.config.stream_block_size;
        let report = self.fifo()?.stream_from(source, limit, block_size)?;
        lifecycle!(
            self.config.verbose,
            header_bytes = headers.len(),
            body_bytes = report.bytes,
            truncated = report.truncated,
            "streamed message"
        );
        Ok(report)
    }

    fn send_headers(&mut self, headers: &str) -> Result<()> {
        if headers.is_empty() {
            return Err(ClientError::InvalidArgument("headers must not be empty"));
        }
        let control = self.control.as_mut().ok_or(ClientError::Closed)?;

        self.tx_buf.clear();
        encode_frame(
            self.token,
            headers,
            control.max_message_size(),
            &mut self.tx_buf,
        )?;
        control.send(&self.tx_buf)?;
        debug!(bytes = self.tx_buf.len(), "sent header frame");
        Ok(())
    }

    /// Create the inbound queue `name` holding up to `max_messages` messages
    /// of `max_message_size` bytes.
    #[cfg(target_os = "linux")]
    pub fn create_receiver(
        &mut self,
        name: &str,
        max_messages: usize,
        max_message_size: usize,
    ) -> Result<()> {
        let config = ReceiverConfig::new(name)
            .with_max_messages(max_messages)
            .with_max_message_size(max_message_size);
        self.create_receiver_with(&config)
    }

    /// Create (or open) an inbound queue and start owning it.
    ///
    /// Replaces any receiver created earlier.
    #[cfg(target_os = "linux")]
    pub fn create_receiver_with(&mut self, config: &ReceiverConfig) -> Result<()> {
        self.ensure_open()?;
        let receiver = Receiver::create(config)?;
        lifecycle!(
            self.config.verbose,
            name = %config.name,
            buffer_size = receiver.buffer_size(),
            "receiver created"
        );
        self.attach_receiver(receiver)
    }

    /// Start owning an already built receiver, replacing any earlier one.
    pub fn attach_receiver(&mut self, receiver: Receiver) -> Result<()> {
        self.ensure_open()?;
        if self.receiver.replace(receiver).is_some() {
            debug!("replaced existing receiver");
        }
        Ok(())
    }

    /// Block until a message arrives on the receiver.
    ///
    /// The message borrows the client's receive buffer and is valid until
    /// the next receive.
    pub fn receive(&mut self) -> Result<Message<'_>> {
        self.receive_inner(None)
    }

    /// Like [`Client::receive`], but give up once `timeout` elapses.
    pub fn receive_timeout(&mut self, timeout: Duration) -> Result<Message<'_>> {
        self.receive_inner(Some(timeout))
    }

    fn receive_inner(&mut self, timeout: Option<Duration>) -> Result<Message<'_>> {
        let verbose = self.config.verbose;
        let receiver = self.receiver.as_mut().ok_or(ClientError::Closed)?;
        let message = receiver.receive(timeout)?;
        lifecycle!(
            verbose,
            header_bytes = message.headers.map_or(0, <[u8]>::len),
            body_bytes = message.body.map_or(0, <[u8]>::len),
            "received message"
        );
        Ok(message)
    }

    /// Release the body FIFO, the control channel and the receiver, in that
    /// order. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        if let Some(mut fifo) = self.fifo.take() {
            fifo.remove();
        }
        self.control = None;
        self.tx_buf = Vec::new();
        self.receiver = None;
        lifecycle!(self.config.verbose, token = self.token, "client closed");
        Ok(())
    }

    /// Switch per-operation logging between INFO and DEBUG.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.config.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.config.verbose
    }

    /// The token written into every header frame (the process id).
    pub fn process_token(&self) -> u32 {
        self.token
    }

    /// Path of the body FIFO, until the client is closed.
    pub fn stream_path(&self) -> Option<&Path> {
        self.fifo.as_ref().map(BodyFifo::path)
    }

    /// Control channel message limit, until the client is closed.
    pub fn max_message_size(&self) -> Option<usize> {
        self.control.as_ref().map(|c| c.max_message_size())
    }

    pub fn has_receiver(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.control.is_none() && self.fifo.is_none() && self.receiver.is_none()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.control.is_none() {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    fn fifo(&self) -> Result<&BodyFifo> {
        self.fifo.as_ref().ok_or(ClientError::Closed)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
