//! Header codec and frame format for the IoT hub client.
//!
//! A message is a text header block plus an arbitrary binary body:
//! - outbound, the header block is wrapped in a control frame of a 4-byte
//!   `"IOTC"` tag and the sender's 4-byte process token, and travels alone on
//!   the control channel; the body follows on the body stream
//! - inbound, headers and body arrive together in one buffer, separated by
//!   the first empty line (`"\n\n"`)
//!
//! Header blocks are `name:value` lines terminated by an empty line.

pub mod codec;
pub mod error;
pub mod headers;

pub use codec::{
    decode_frame, encode_frame, find_header_end, split_frame, split_frame_at, ControlFrame, FrameParts,
    FRAME_PREFIX_SIZE, HEADER_TERMINATOR, MAX_BODY_SIZE, PREAMBLE,
};
pub use error::{FrameError, Result};
pub use headers::{copy_property, get_property, Headers};
