use std::os::raw::c_char;

use iotclient_frame::copy_property;
use iotclient_session::ClientError;

use crate::args;
use crate::error;
use crate::types::IotResult;

/// Copy the value of header `name` from `headers` into `buf` as a C string.
///
/// Fails with `NotFound` when the property is absent and `BufferTooSmall` when `len` cannot
/// hold the value plus its NUL; `buf` is left untouched on failure.
///
/// # Safety
/// `headers` and `name` must be non-null UTF-8 C strings. If `len > 0`, `buf` must be non-null
/// and writable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn iotclient_get_property(
    headers: *const c_char,
    name: *const c_char,
    buf: *mut c_char,
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
        let name = {
            // SAFETY: We validate null and UTF-8 in helper.
            match unsafe { args::required_str_arg(name, "name") } {
                Some(v) => v,
                None => return IotResult::InvalidArgument,
            }
        };
        let out = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::out_buf_arg(buf, len, "buf") } {
                Some(v) => v,
                None => return IotResult::InvalidArgument,
            }
        };

        match copy_property(headers, name, out) {
            Ok(_) => IotResult::Ok,
            Err(err) => error::map_client_error(&ClientError::from(err)),
        }
    })
}
