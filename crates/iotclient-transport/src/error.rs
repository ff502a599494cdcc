use std::path::PathBuf;

/// Errors that can occur in channel and FIFO operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open (or create) a named message queue.
    #[error("failed to open message queue {name}: {source}")]
    Open {
        name: String,
        source: std::io::Error,
    },

    /// Failed to read back the attributes of an open queue.
    #[error("failed to query attributes of {name}: {source}")]
    Attributes {
        name: String,
        source: std::io::Error,
    },

    /// Failed to create the body-stream FIFO.
    #[error("failed to create fifo {path}: {source}")]
    CreateFifo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open the body-stream FIFO for writing.
    #[error("failed to open fifo {path}: {source}")]
    OpenFifo {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on a queue or FIFO.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fewer bytes were written than requested.
    #[error("partial write ({written} of {expected} bytes)")]
    PartialWrite { written: usize, expected: usize },

    /// The message does not fit in a single queue message.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The requested queue attributes cannot be used.
    #[error("invalid queue attributes: {0}")]
    InvalidAttributes(&'static str),

    /// The queue name cannot be used.
    #[error("invalid queue name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The channel was never created or has already been closed.
    #[error("channel closed or uninitialized")]
    Closed,
}

impl TransportError {
    /// The platform error code behind this error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            TransportError::Open { source, .. }
            | TransportError::Attributes { source, .. }
            | TransportError::CreateFifo { source, .. }
            | TransportError::OpenFifo { source, .. }
            | TransportError::Io(source) => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
