use iotclient_frame::FrameError;
use iotclient_transport::TransportError;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A required argument was empty or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The message body exceeds the size ceiling.
    #[error("message body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// A scratch buffer could not be allocated.
    #[error("failed to allocate a {requested} byte buffer")]
    OutOfMemory { requested: usize },

    /// Channel or FIFO error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Header codec error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The client has been closed, or no receiver was created.
    #[error("client closed or receiver not created")]
    Closed,
}

/// Broad classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required input was missing, empty or malformed.
    InvalidArgument,
    /// Headers or body exceed a size ceiling.
    SizeExceeded,
    /// A header property is absent.
    NotFound,
    /// A caller-supplied buffer is too small.
    BufferTooSmall,
    /// An allocation failed.
    OutOfMemory,
    /// A channel or file operation failed.
    Io,
    /// The channel was never created or has been destroyed.
    ClosedOrUninitialized,
}

impl ClientError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ClientError::BodyTooLarge { .. } => ErrorKind::SizeExceeded,
            ClientError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            ClientError::Closed => ErrorKind::ClosedOrUninitialized,
            ClientError::Transport(err) => match err {
                TransportError::InvalidName { .. } | TransportError::InvalidAttributes(_) => {
                    ErrorKind::InvalidArgument
                }
                TransportError::MessageTooLarge { .. } => ErrorKind::SizeExceeded,
                TransportError::Closed => ErrorKind::ClosedOrUninitialized,
                _ => ErrorKind::Io,
            },
            ClientError::Frame(err) => match err {
                FrameError::HeadersTooLarge { .. } => ErrorKind::SizeExceeded,
                FrameError::NotFound(_) => ErrorKind::NotFound,
                FrameError::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
                _ => ErrorKind::InvalidArgument,
            },
        }
    }

    /// The platform error code behind this error, if any.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ClientError::Transport(err) => err.raw_os_error(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
