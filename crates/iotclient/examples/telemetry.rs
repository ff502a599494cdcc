//! Send one telemetry message, then stream a file as a second message.
//!
//! Requires a running hub reading the `/iothub` queue.
//!
//! ```sh
//! cargo run -p iotclient --example telemetry -- /var/log/sensor.log
//! ```

use std::fs::File;

use iotclient::{Client, ClientError, Headers};

fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt().init();

    let mut client = Client::create()?;
    client.set_verbose(true);

    let headers = Headers::new()
        .with("topic", "telemetry")?
        .with("content-type", "application/json")?;
    client.send(&headers.to_block(), br#"{"temp":21.5,"unit":"C"}"#)?;

    if let Some(path) = std::env::args().nth(1) {
        let mut file = File::open(&path).map_err(iotclient::transport::TransportError::Io)?;
        let headers = Headers::new()
            .with("topic", "log-upload")?
            .with("file", path.as_str())?;
        let report = client.stream(&headers.to_block(), &mut file)?;
        println!("uploaded {} bytes (truncated: {})", report.bytes, report.truncated);
    }

    client.close()
}
