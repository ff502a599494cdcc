#![cfg(target_os = "linux")]

use std::fs::File;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use iotclient::frame::{decode_frame, get_property};
use iotclient::session::{Client, ClientConfig, ErrorKind, ReceiverConfig};
use iotclient::transport::{ControlChannel, InboundChannel, MessageQueue};

fn unique(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("iotclient-it-{tag}-{}-{nanos}", std::process::id())
}

fn temp_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(unique(tag));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Upper bound on any single hub-side wait.
const HUB_WAIT: Duration = Duration::from_secs(5);

struct HubMessage {
    token: u32,
    headers: String,
    body: Vec<u8>,
}

/// Plays the hub: take one header frame off the control queue, then read the
/// body from the sender's FIFO under `root`.
fn hub_accept(hub: &mut MessageQueue, root: &Path) -> HubMessage {
    let mut buf = vec![0u8; hub.max_message_size()];
    let len = hub.receive(&mut buf, Some(HUB_WAIT)).unwrap();
    let frame = decode_frame(&buf[..len]).unwrap();

    let fifo = root.join(format!("iothub_{}", frame.token));
    let mut body = Vec::new();
    File::open(fifo).unwrap().read_to_end(&mut body).unwrap();

    HubMessage {
        token: frame.token,
        headers: frame.headers_str().unwrap().to_string(),
        body,
    }
}

/// Open and drop the read side of every FIFO under `root` so a client blocked
/// opening it for writing is released and fails instead of hanging.
fn release_writer(root: &Path) {
    for entry in std::fs::read_dir(root).into_iter().flatten().flatten() {
        let path = entry.path();
        thread::spawn(move || drop(File::open(path)));
    }
}

#[test]
fn messages_reach_the_hub_in_order() {
    let root = temp_root("order");
    let hub_name = format!("/{}", unique("hub"));
    let mut hub = MessageQueue::create_reader(&hub_name, 4, 512).unwrap();

    let config = ClientConfig::default()
        .with_hub_queue(hub_name.as_str())
        .with_stream_root(&root);
    let mut client = Client::create_with_config(config).unwrap();
    assert_eq!(client.max_message_size(), Some(512));

    // Body boundaries on the FIFO rely on the hub draining each body to EOF
    // before the next send opens it, so every body is acknowledged first.
    let (acks, delivered) = mpsc::channel();
    let hub_root = root.clone();
    let hub_thread = thread::spawn(move || {
        for _ in 0..3 {
            let accepted =
                panic::catch_unwind(AssertUnwindSafe(|| hub_accept(&mut hub, &hub_root)));
            let Ok(message) = accepted else {
                release_writer(&hub_root);
                break;
            };
            if acks.send(message).is_err() {
                break;
            }
        }
    });
    let next = || delivered.recv_timeout(HUB_WAIT).expect("hub stopped delivering");

    client.send("seq:1\n\n", b"first").unwrap();
    let first = next();
    client.send("seq:2\n\n", b"").unwrap();
    let second = next();
    let mut source: &[u8] = &[0x5a; 20_000];
    let report = client.stream("seq:3\nkind:blob\n\n", &mut source).unwrap();
    assert_eq!(report.bytes, 20_000);
    assert!(!report.truncated);
    let third = next();
    hub_thread.join().unwrap();

    let received = [first, second, third];
    assert!(received.iter().all(|m| m.token == std::process::id()));
    let seqs: Vec<&str> = received
        .iter()
        .map(|m| get_property(&m.headers, "seq").unwrap())
        .collect();
    assert_eq!(seqs, ["1", "2", "3"]);
    assert_eq!(received[0].body, b"first");
    assert!(received[1].body.is_empty());
    assert_eq!(received[2].body.len(), 20_000);
    assert_eq!(get_property(&received[2].headers, "kind").unwrap(), "blob");

    client.close().unwrap();
    assert!(client.stream_path().is_none());
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);

    MessageQueue::unlink(&hub_name).unwrap();
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn headers_at_queue_limit_are_rejected() {
    let root = temp_root("limit");
    let hub_name = format!("/{}", unique("hub"));
    let hub = MessageQueue::create_reader(&hub_name, 2, 64).unwrap();

    let config = ClientConfig::default()
        .with_hub_queue(hub_name.as_str())
        .with_stream_root(&root);
    let mut client = Client::create_with_config(config).unwrap();

    let headers = "x".repeat(64 - 8);
    let err = client.send(&headers, b"").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SizeExceeded);
    assert_eq!(hub.pending().unwrap(), 0);

    drop(client);
    drop(hub);
    MessageQueue::unlink(&hub_name).unwrap();
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn missing_hub_fails_without_leaving_a_fifo() {
    let root = temp_root("nohub");
    let config = ClientConfig::default()
        .with_hub_queue(format!("/{}", unique("absent")))
        .with_stream_root(&root);

    let err = Client::create_with_config(config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(err.raw_os_error().is_some());
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn receiver_delivers_hub_messages() {
    let root = temp_root("rx");
    let hub_name = format!("/{}", unique("hub"));
    let rx_name = format!("/{}", unique("rx"));
    let hub = MessageQueue::create_reader(&hub_name, 2, 256).unwrap();

    let config = ClientConfig::default()
        .with_hub_queue(hub_name.as_str())
        .with_stream_root(&root);
    let mut client = Client::create_with_config(config).unwrap();
    client
        .create_receiver_with(&ReceiverConfig::new(rx_name.as_str()).with_max_message_size(256))
        .unwrap();
    assert!(client.has_receiver());

    let mut device = MessageQueue::open_writer(&rx_name).unwrap();
    device.send(b"cmd:set\nkey:interval\n\n30").unwrap();
    device.send(b"no headers here").unwrap();

    let message = client.receive().unwrap();
    assert_eq!(message.property("cmd").unwrap(), "set");
    assert_eq!(message.property("key").unwrap(), "interval");
    assert_eq!(message.body, Some(&b"30"[..]));

    let message = client.receive().unwrap();
    assert_eq!(message.headers, None);
    assert_eq!(message.body, Some(&b"no headers here"[..]));

    let err = client
        .receive_timeout(Duration::from_millis(20))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    client.close().unwrap();
    client.close().unwrap();
    assert_eq!(
        client.receive().unwrap_err().kind(),
        ErrorKind::ClosedOrUninitialized
    );

    drop(device);
    drop(hub);
    MessageQueue::unlink(&rx_name).unwrap();
    MessageQueue::unlink(&hub_name).unwrap();
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn existing_receiver_queue_keeps_its_larger_message_size() {
    let root = temp_root("rxsize");
    let hub_name = format!("/{}", unique("hub"));
    let rx_name = format!("/{}", unique("rx"));
    let hub = MessageQueue::create_reader(&hub_name, 2, 256).unwrap();
    let existing = MessageQueue::create_reader(&rx_name, 2, 1024).unwrap();

    let config = ClientConfig::default()
        .with_hub_queue(hub_name.as_str())
        .with_stream_root(&root);
    let mut client = Client::create_with_config(config).unwrap();
    client
        .create_receiver_with(&ReceiverConfig::new(rx_name.as_str()).with_max_message_size(128))
        .unwrap();

    let payload = vec![b'p'; 900];
    let mut device = MessageQueue::open_writer(&rx_name).unwrap();
    device.send(&payload).unwrap();

    let message = client.receive().unwrap();
    assert_eq!(message.body.map(<[u8]>::len), Some(900));

    drop(client);
    drop(device);
    drop(existing);
    drop(hub);
    MessageQueue::unlink(&rx_name).unwrap();
    MessageQueue::unlink(&hub_name).unwrap();
    let _ = std::fs::remove_dir_all(&root);
}
