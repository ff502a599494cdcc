//! Device-side session with the IoT hub.
//!
//! A [`Client`] joins the hub's control queue, owns a per-process body FIFO,
//! and optionally an inbound [`Receiver`] queue:
//!
//! ```no_run
//! use iotclient_session::Client;
//!
//! let mut client = Client::create()?;
//! client.send("topic:telemetry\ncontent-type:text/plain\n\n", b"21.5")?;
//!
//! client.create_receiver("/device-42", 10, 8192)?;
//! let message = client.receive()?;
//! println!("command: {}", message.property("cmd")?);
//! # Ok::<(), iotclient_session::ClientError>(())
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod receiver;

pub use client::Client;
pub use config::{ClientConfig, ReceiverConfig, DEFAULT_HUB_QUEUE, DEFAULT_STREAM_ROOT};
pub use error::{ClientError, ErrorKind, Result};
pub use iotclient_transport::StreamReport;
pub use receiver::{Message, OwnedMessage, Receiver};
