use std::fs::File;
use std::mem::ManuallyDrop;
use std::os::fd::FromRawFd;
use std::os::raw::{c_char, c_int};

use iotclient_session::{Client, ClientConfig};

use crate::args;
use crate::error;
use crate::types::{ClientHandle, IotClientHandle, IotResult};

fn with_client_mut<T>(
    handle: IotClientHandle,
    on_error: T,
    f: impl FnOnce(&mut Client) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("client handle cannot be null");
        return on_error;
    }

    let client_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ClientHandle) }
    };

    f(&mut client_handle.client)
}

fn into_handle(result: iotclient_session::Result<Client>) -> IotClientHandle {
    match result {
        Ok(client) => Box::into_raw(Box::new(ClientHandle { client })) as IotClientHandle,
        Err(err) => {
            let _ = error::map_client_error(&err);
            std::ptr::null_mut()
        }
    }
}

/// Connect to the hub at `/iothub`, with the body FIFO under `/tmp`.
///
/// Returns null on failure; see `iotclient_last_error`.
#[cfg(target_os = "linux")]
#[no_mangle]
pub extern "C" fn iotclient_create() -> IotClientHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        into_handle(Client::create())
    })
}

/// Connect to the hub queue `hub_queue`, placing the body FIFO in `stream_root`.
///
/// # Safety
/// `hub_queue` and `stream_root` must be non-null, valid UTF-8, NUL-terminated C strings.
#[cfg(target_os = "linux")]
#[no_mangle]
pub unsafe extern "C" fn iotclient_create_at(
    hub_queue: *const c_char,
    stream_root: *const c_char,
) -> IotClientHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let hub_queue = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(hub_queue, "hub_queue") } {
                Some(v) => v,
                None => return std::ptr::null_mut(),
            }
        };
        let stream_root = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(stream_root, "stream_root") } {
                Some(v) => v,
                None => return std::ptr::null_mut(),
            }
        };

        let config = ClientConfig::default()
            .with_hub_queue(hub_queue)
            .with_stream_root(stream_root);
        into_handle(Client::create_with_config(config))
    })
}

/// Send a header block and a body of `len` bytes.
///
/// # Safety
/// `client` must be a valid client handle. `headers` must be a non-null UTF-8 C string. If
/// `len > 0`, `body` must be non-null and readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn iotclient_send(
    client: IotClientHandle,
    headers: *const c_char,
    body: *const u8,
    len: usize,
) -> IotResult {
    crate::ffi_boundary(IotResult::Internal, || {
        error::clear_error_state();

        let headers = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(headers, "headers") } {
                Some(v) => v,
                None => return IotResult::InvalidArgument,
            }
        };
        let body = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(body, len, "body") } {
                Some(v) => v,
                None => return IotResult::InvalidArgument,
            }
        };

        with_client_mut(client, IotResult::InvalidArgument, |client| {
            match client.send(headers, body) {
                Ok(()) => IotResult::Ok,
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}

/// Send a header block, then forward everything readable from `fd` as the body.
///
/// `fd` is borrowed and left open. `out_bytes`, when non-null, receives the number of body
/// bytes forwarded.
///
/// # Safety
/// `client` must be a valid client handle and `headers` a non-null UTF-8 C string. `fd` must be
/// an open, readable descriptor for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn iotclient_stream(
    client: IotClientHandle,
    headers: *const c_char,
    fd: c_int,
    out_bytes: *mut u64,
) -> IotResult {
    crate::ffi_boundary(IotResult::Internal, || {
        error::clear_error_state();

        let headers = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(headers, "headers") } {
                Some(v) => v,
                None => return IotResult::InvalidArgument,
            }
        };
        if fd < 0 {
            return error::set_invalid_argument("fd must be a valid descriptor");
        }

        // SAFETY: `fd` is open for the call; ManuallyDrop keeps it from being closed.
        let mut source = ManuallyDrop::new(unsafe { File::from_raw_fd(fd) });

        with_client_mut(client, IotResult::InvalidArgument, |client| {
            match client.stream(headers, &mut *source) {
                Ok(report) => {
                    if !out_bytes.is_null() {
                        // SAFETY: Pointer was checked for null above.
                        unsafe {
                            *out_bytes = report.bytes;
                        }
                    }
                    IotResult::Ok
                }
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}

/// Create (or open) the inbound queue `name` this client receives from.
///
/// # Safety
/// `client` must be a valid client handle and `name` a non-null UTF-8 C string.
#[cfg(target_os = "linux")]
#[no_mangle]
pub unsafe extern "C" fn iotclient_create_receiver(
    client: IotClientHandle,
    name: *const c_char,
    max_messages: usize,
    max_message_size: usize,
) -> IotResult {
    crate::ffi_boundary(IotResult::Internal, || {
        error::clear_error_state();

        let name = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(name, "name") } {
                Some(v) => v,
                None => return IotResult::InvalidArgument,
            }
        };

        let config = iotclient_session::ReceiverConfig::new(name)
            .with_max_messages(max_messages)
            .with_max_message_size(max_message_size);
        with_client_mut(client, IotResult::InvalidArgument, |client| {
            match client.create_receiver_with(&config) {
                Ok(()) => IotResult::Ok,
                Err(err) => error::map_client_error(&err),
            }
        })
    })
}

/// Block until a message arrives on the client's receiver.
///
/// On success `*out_headers` points at the NUL-terminated header block (or is null when the
/// message had none) and `*out_body` at the body (or null). Both point into the client's
/// receive buffer and stay valid until the next receive or close. The length outputs are
/// optional.
///
/// # Safety
/// `client` must be a valid client handle. `out_headers` and `out_body` must be non-null and
/// writable; `out_headers_len` and `out_body_len` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn iotclient_receive(
    client: IotClientHandle,
    out_headers: *mut *const c_char,
    out_body: *mut *const u8,
    out_headers_len: *mut usize,
    out_body_len: *mut usize,
) -> IotResult {
    crate::ffi_boundary(IotResult::Internal, || {
        error::clear_error_state();

        if out_headers.is_null() {
            return error::set_invalid_argument("out_headers cannot be null");
        }
        if out_body.is_null() {
            return error::set_invalid_argument("out_body cannot be null");
        }

        with_client_mut(client, IotResult::InvalidArgument, |client| {
            let message = match client.receive() {
                Ok(message) => message,
                Err(err) => return error::map_client_error(&err),
            };
            let (headers_ptr, headers_len) = message
                .headers
                .map_or((std::ptr::null(), 0), |h| (h.as_ptr().cast::<c_char>(), h.len()));
            let (body_ptr, body_len) = message
                .body
                .map_or((std::ptr::null(), 0), |b| (b.as_ptr(), b.len()));

            // SAFETY: Output pointers were checked for null above or here.
            unsafe {
                *out_headers = headers_ptr;
                *out_body = body_ptr;
                if !out_headers_len.is_null() {
                    *out_headers_len = headers_len;
                }
                if !out_body_len.is_null() {
                    *out_body_len = body_len;
                }
            }
            IotResult::Ok
        })
    })
}

/// Switch per-operation logging between INFO and DEBUG.
///
/// # Safety
/// `client` must be a valid client handle.
#[no_mangle]
pub unsafe extern "C" fn iotclient_set_verbose(client: IotClientHandle, verbose: bool) -> IotResult {
    crate::ffi_boundary(IotResult::Internal, || {
        error::clear_error_state();

        with_client_mut(client, IotResult::InvalidArgument, |client| {
            client.set_verbose(verbose);
            IotResult::Ok
        })
    })
}

/// Release the client's channels and free the handle.
///
/// # Safety
/// `client` must be null or a handle returned by `iotclient_create`/`iotclient_create_at`,
/// and must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn iotclient_close(client: IotClientHandle) -> IotResult {
    crate::ffi_boundary(IotResult::Internal, || {
        error::clear_error_state();

        if client.is_null() {
            return IotResult::Ok;
        }

        // SAFETY: Caller guarantees this handle was allocated by iotclient_create*.
        let mut handle = unsafe { Box::from_raw(client as *mut ClientHandle) };
        match handle.client.close() {
            Ok(()) => IotResult::Ok,
            Err(err) => error::map_client_error(&err),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_invalid_argument() {
        // SAFETY: Null handles are rejected before any dereference.
        let result = unsafe {
            iotclient_send(
                std::ptr::null_mut(),
                c"a:1\n\n".as_ptr(),
                std::ptr::null(),
                0,
            )
        };
        assert_eq!(result, IotResult::InvalidArgument);

        // SAFETY: As above.
        let result = unsafe { iotclient_set_verbose(std::ptr::null_mut(), true) };
        assert_eq!(result, IotResult::InvalidArgument);
    }

    #[test]
    fn null_headers_are_invalid_argument() {
        // SAFETY: Null headers are rejected before the handle is touched.
        let result =
            unsafe { iotclient_send(std::ptr::null_mut(), std::ptr::null(), std::ptr::null(), 0) };
        assert_eq!(result, IotResult::InvalidArgument);
    }

    #[test]
    fn negative_fd_is_invalid_argument() {
        // SAFETY: The fd is rejected before the handle is touched.
        let result = unsafe {
            iotclient_stream(std::ptr::null_mut(), c"a:1\n\n".as_ptr(), -1, std::ptr::null_mut())
        };
        assert_eq!(result, IotResult::InvalidArgument);
    }

    #[test]
    fn close_null_is_ok() {
        // SAFETY: Null is accepted.
        assert_eq!(unsafe { iotclient_close(std::ptr::null_mut()) }, IotResult::Ok);
    }
}
