use std::path::PathBuf;

use iotclient_frame::MAX_BODY_SIZE;
use iotclient_transport::DEFAULT_BLOCK_SIZE;

/// Well-known name of the hub's inbound control queue.
pub const DEFAULT_HUB_QUEUE: &str = "/iothub";

/// Directory the hub looks in for body-stream FIFOs.
pub const DEFAULT_STREAM_ROOT: &str = "/tmp";

/// Controls how a [`Client`](crate::Client) reaches the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Control queue shared with the hub. Default: `/iothub`.
    pub hub_queue: String,
    /// Directory holding the body-stream FIFO. Default: `/tmp`.
    pub stream_root: PathBuf,
    /// Body size ceiling in bytes, capped at [`MAX_BODY_SIZE`]. Default: 256 MiB.
    pub max_body_size: usize,
    /// Block size used by [`Client::stream`](crate::Client::stream). Default: 8 KiB.
    pub stream_block_size: usize,
    /// Log per-operation events at INFO instead of DEBUG.
    pub verbose: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hub_queue: DEFAULT_HUB_QUEUE.to_string(),
            stream_root: PathBuf::from(DEFAULT_STREAM_ROOT),
            max_body_size: MAX_BODY_SIZE,
            stream_block_size: DEFAULT_BLOCK_SIZE,
            verbose: false,
        }
    }
}

impl ClientConfig {
    pub fn with_hub_queue(mut self, name: impl Into<String>) -> Self {
        self.hub_queue = name.into();
        self
    }

    pub fn with_stream_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.stream_root = root.into();
        self
    }

    /// Lower the body ceiling. Values above [`MAX_BODY_SIZE`] are capped.
    pub fn with_max_body_size(mut self, max: usize) -> Self {
        self.max_body_size = max.min(MAX_BODY_SIZE);
        self
    }

    pub fn with_stream_block_size(mut self, size: usize) -> Self {
        self.stream_block_size = size;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Ceiling actually enforced, whatever was written to the field.
    pub fn effective_max_body_size(&self) -> usize {
        self.max_body_size.min(MAX_BODY_SIZE)
    }
}

/// Parameters of an inbound receive queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Queue name; a leading `/` is added when missing.
    pub name: String,
    /// Messages the queue can hold before the hub blocks.
    pub max_messages: usize,
    /// Largest message, and the size of the receive buffer.
    pub max_message_size: usize,
}

impl ReceiverConfig {
    /// Default queue depth: the unprivileged Linux `msg_max` default.
    pub const DEFAULT_MAX_MESSAGES: usize = 10;
    /// Default message size: the unprivileged Linux `msgsize_max` default.
    pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_messages: Self::DEFAULT_MAX_MESSAGES,
            max_message_size: Self::DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}
