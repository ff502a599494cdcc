/// Errors that can occur while encoding, decoding or querying headers.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header block does not fit in one control-channel message.
    #[error("header block too large ({size} bytes with prefix, channel limit {max})")]
    HeadersTooLarge { size: usize, max: usize },

    /// The requested property is not present in the header block.
    #[error("property {0:?} not found")]
    NotFound(String),

    /// The caller's buffer cannot hold the property value and its terminator.
    #[error("buffer too small ({needed} bytes needed, capacity {capacity})")]
    BufferTooSmall { needed: usize, capacity: usize },

    /// The control frame does not start with the `"IOTC"` tag.
    #[error("invalid frame preamble (expected \"IOTC\")")]
    InvalidPreamble,

    /// The control frame is shorter than its fixed prefix.
    #[error("truncated frame ({len} bytes)")]
    Truncated { len: usize },

    /// A header name or value cannot be represented in the wire format.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
