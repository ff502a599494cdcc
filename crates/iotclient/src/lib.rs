//! Device-side client for a local IoT hub.
//!
//! Processes talk to the hub through two kinds of host channel: a shared,
//! size-limited message queue that carries header frames, and a per-process
//! named FIFO that carries message bodies of any size up to 256 MiB. The hub
//! answers on per-device inbound queues.
//!
//! # Crate Structure
//!
//! - [`transport`]: message queue and FIFO channels
//! - [`frame`]: control frame codec and header block helpers
//! - [`session`]: the [`Client`](session::Client) and its receiver (behind `session` feature)
//!
//! ```no_run
//! use iotclient::session::Client;
//!
//! let mut client = Client::create()?;
//! client.send("topic:telemetry\n\n", b"{\"temp\":21.5}")?;
//! client.close()?;
//! # Ok::<(), iotclient::session::ClientError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use iotclient_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use iotclient_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use iotclient_session::*;
}

pub use iotclient_frame::{get_property, Headers};
#[cfg(feature = "session")]
pub use iotclient_session::{Client, ClientConfig, ClientError, ErrorKind, Message};
