//! Create an inbound queue and print every command the hub delivers.
//!
//! ```sh
//! cargo run -p iotclient --example command-listener -- /device-42
//! ```

use iotclient::{Client, ClientError};

fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt().init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("/device-{}", std::process::id()));

    let mut client = Client::create()?;
    client.create_receiver(&name, 10, 8192)?;
    println!("listening on {name}");

    loop {
        let message = client.receive()?;
        let command = message.property("cmd").unwrap_or("<none>");
        let body = message.body.map_or(0, <[u8]>::len);
        println!("cmd={command} body={body} bytes");
        if command == "quit" {
            break;
        }
    }

    client.close()
}
