use bytes::BufMut;

use crate::error::{FrameError, Result};

/// Tag that opens every control frame.
pub const PREAMBLE: [u8; 4] = *b"IOTC";

/// Control frame prefix: tag (4) + process token (4) = 8 bytes.
pub const FRAME_PREFIX_SIZE: usize = 8;

/// Largest message body accepted by the hub: 256 MiB.
pub const MAX_BODY_SIZE: usize = 256 * 1024 * 1024;

/// Separates the header block from the body: an empty line.
pub const HEADER_TERMINATOR: &[u8; 2] = b"\n\n";

/// A decoded control frame, borrowing from the received buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFrame<'a> {
    /// Process token of the sending client.
    pub token: u32,
    /// The raw header block.
    pub headers: &'a [u8],
}

impl<'a> ControlFrame<'a> {
    /// The header block as text, if it is valid UTF-8.
    pub fn headers_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.headers).ok()
    }
}

/// Encode a header block into a control frame.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┬──────────────────────┐
/// │ Tag (4B)     │ Token (4B)       │ Header block         │
/// │ "IOTC"       │ native order     │ (name:value\n...\n)  │
/// └──────────────┴──────────────────┴──────────────────────┘
/// ```
///
/// The whole frame must stay strictly below `max_message_size`, the control
/// channel's negotiated limit.
pub fn encode_frame<B: BufMut>(
    token: u32,
    headers: &str,
    max_message_size: usize,
    dst: &mut B,
) -> Result<()> {
    let size = FRAME_PREFIX_SIZE + headers.len();
    if size >= max_message_size {
        return Err(FrameError::HeadersTooLarge {
            size,
            max: max_message_size,
        });
    }
    dst.put_slice(&PREAMBLE);
    dst.put_u32_ne(token);
    dst.put_slice(headers.as_bytes());
    Ok(())
}

/// Decode a control frame as the hub sees it.
pub fn decode_frame(src: &[u8]) -> Result<ControlFrame<'_>> {
    if src.len() < FRAME_PREFIX_SIZE {
        return Err(FrameError::Truncated { len: src.len() });
    }
    if src[0..4] != PREAMBLE {
        return Err(FrameError::InvalidPreamble);
    }
    let token = u32::from_ne_bytes([src[4], src[5], src[6], src[7]]);
    Ok(ControlFrame {
        token,
        headers: &src[FRAME_PREFIX_SIZE..],
    })
}

/// Header and body views of a received message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameParts<'a> {
    /// Header block, without the terminating empty line.
    pub headers: Option<&'a [u8]>,
    /// Message body.
    pub body: Option<&'a [u8]>,
}

/// Offset of the first `"\n\n"` in `buf`.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

/// Split a received message into header block and body.
///
/// - no delimiter: the whole buffer is body
/// - delimiter at offset `k`: headers are `buf[..k]`, body is `buf[k + 2..]`,
///   or `None` when nothing follows the delimiter
pub fn split_frame(buf: &[u8]) -> FrameParts<'_> {
    split_frame_at(buf, find_header_end(buf))
}

/// Split a received message at an already located header end.
///
/// `header_end` must be the result of [`find_header_end`] on the same bytes;
/// the delimiter itself is never inspected, so the caller may overwrite it.
/// An offset past the end of `buf` is treated as no delimiter.
pub fn split_frame_at(buf: &[u8], header_end: Option<usize>) -> FrameParts<'_> {
    match header_end.filter(|&end| end <= buf.len()) {
        None => FrameParts {
            headers: None,
            body: Some(buf),
        },
        Some(end) => {
            let body_start = end + HEADER_TERMINATOR.len();
            FrameParts {
                headers: Some(&buf[..end]),
                body: (body_start < buf.len()).then(|| &buf[body_start..]),
            }
        }
    }
}
