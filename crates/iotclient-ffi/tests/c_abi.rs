#![cfg(target_os = "linux")]

use std::ffi::{CStr, CString};
use std::fs::File;
use std::io::Read;
use std::os::raw::c_char;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use iotclient_ffi::*;
use iotclient_frame::decode_frame;
use iotclient_transport::{ControlChannel, InboundChannel, MessageQueue};

fn unique(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("iotclient-ffi-{tag}-{}-{nanos}", std::process::id())
}

fn temp_root(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(unique(tag));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn c_string(value: impl Into<Vec<u8>>) -> CString {
    CString::new(value).unwrap()
}

fn last_error() -> String {
    // SAFETY: iotclient_last_error returns a pointer to a thread-local CString.
    unsafe { CStr::from_ptr(iotclient_last_error()) }
        .to_string_lossy()
        .into_owned()
}

#[test]
fn missing_hub_reports_os_error() {
    let root = temp_root("missing");
    let hub = c_string(format!("/{}", unique("nohub")));
    let root_c = c_string(root.to_str().unwrap());

    // SAFETY: Both arguments are valid C strings.
    let handle = unsafe { iotclient_create_at(hub.as_ptr(), root_c.as_ptr()) };
    assert!(handle.is_null());
    assert!(!last_error().is_empty());
    let code = iotclient_last_os_error();
    assert_eq!(
        std::io::Error::from_raw_os_error(code).kind(),
        std::io::ErrorKind::NotFound
    );
    assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn send_and_receive_roundtrip() {
    let root = temp_root("roundtrip");
    let hub_name = format!("/{}", unique("hub"));
    let rx_name = format!("/{}", unique("rx"));
    let mut hub = MessageQueue::create_reader(&hub_name, 4, 256).unwrap();

    let hub_c = c_string(hub_name.as_str());
    let root_c = c_string(root.to_str().unwrap());
    // SAFETY: Both arguments are valid C strings.
    let handle = unsafe { iotclient_create_at(hub_c.as_ptr(), root_c.as_ptr()) };
    assert!(!handle.is_null(), "{}", last_error());

    // SAFETY: `handle` is live.
    assert_eq!(unsafe { iotclient_set_verbose(handle, true) }, IotResult::Ok);

    let fifo_path = root.join(format!("iothub_{}", std::process::id()));
    let reader = thread::spawn(move || {
        let mut body = Vec::new();
        File::open(fifo_path).unwrap().read_to_end(&mut body).unwrap();
        body
    });

    let headers = c"topic:status\n\n";
    let body = b"online";
    // SAFETY: `handle` is live and `body` is readable for its length.
    let result = unsafe { iotclient_send(handle, headers.as_ptr(), body.as_ptr(), body.len()) };
    assert_eq!(result, IotResult::Ok, "{}", last_error());
    assert_eq!(reader.join().unwrap(), b"online");

    let mut frame = vec![0u8; hub.max_message_size()];
    let len = hub.receive(&mut frame, Some(Duration::from_secs(1))).unwrap();
    let frame = decode_frame(&frame[..len]).unwrap();
    assert_eq!(frame.token, std::process::id());
    assert_eq!(frame.headers, b"topic:status\n\n");

    let rx_c = c_string(rx_name.as_str());
    // SAFETY: `handle` is live and `rx_c` is a valid C string.
    let result = unsafe { iotclient_create_receiver(handle, rx_c.as_ptr(), 4, 128) };
    assert_eq!(result, IotResult::Ok, "{}", last_error());

    let mut device = MessageQueue::open_writer(&rx_name).unwrap();
    device.send(b"cmd:reboot\ndelay:5\n\nnow").unwrap();

    let mut out_headers: *const c_char = std::ptr::null();
    let mut out_body: *const u8 = std::ptr::null();
    let mut headers_len = 0usize;
    let mut body_len = 0usize;
    // SAFETY: `handle` is live and every output pointer is writable.
    let result = unsafe {
        iotclient_receive(
            handle,
            &mut out_headers,
            &mut out_body,
            &mut headers_len,
            &mut body_len,
        )
    };
    assert_eq!(result, IotResult::Ok, "{}", last_error());

    // SAFETY: Receive pointers stay valid until the next receive or close.
    let received_headers = unsafe { CStr::from_ptr(out_headers) };
    assert_eq!(received_headers, c"cmd:reboot\ndelay:5");
    assert_eq!(headers_len, received_headers.to_bytes().len());
    // SAFETY: As above; `body_len` bytes are readable at `out_body`.
    let received_body = unsafe { std::slice::from_raw_parts(out_body, body_len) };
    assert_eq!(received_body, b"now");

    let mut value = [0u8; 8];
    // SAFETY: `out_headers` is a live C string and `value` is writable.
    let result = unsafe {
        iotclient_get_property(
            out_headers,
            c"delay".as_ptr(),
            value.as_mut_ptr().cast(),
            value.len(),
        )
    };
    assert_eq!(result, IotResult::Ok);
    assert_eq!(CStr::from_bytes_until_nul(&value).unwrap(), c"5");

    // SAFETY: `handle` is live and not used again.
    assert_eq!(unsafe { iotclient_close(handle) }, IotResult::Ok);
    assert!(!root.join(format!("iothub_{}", std::process::id())).exists());

    drop(device);
    hub.close();
    MessageQueue::unlink(&rx_name).unwrap();
    MessageQueue::unlink(&hub_name).unwrap();
    let _ = std::fs::remove_dir_all(&root);
}
