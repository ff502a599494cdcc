//! iotclient-ffi: C-ABI exports for the IoT hub client.

mod args;
mod client;
mod error;
mod property;
mod types;

use std::panic::AssertUnwindSafe;

#[cfg(target_os = "linux")]
pub use client::{iotclient_create, iotclient_create_at, iotclient_create_receiver};
pub use client::{
    iotclient_close, iotclient_receive, iotclient_send, iotclient_set_verbose, iotclient_stream,
};
pub use property::iotclient_get_property;
pub use types::{
    IotClientHandle, IotResult, IOT_ERR_BUFFER_TOO_SMALL, IOT_ERR_CLOSED, IOT_ERR_INTERNAL,
    IOT_ERR_INVALID_ARGUMENT, IOT_ERR_IO, IOT_ERR_NOT_FOUND, IOT_ERR_OUT_OF_MEMORY,
    IOT_ERR_SIZE_EXCEEDED, IOT_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message describing the last failure on this thread, or an empty string.
#[no_mangle]
pub extern "C" fn iotclient_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// Platform error code behind the last failure on this thread, or 0.
#[no_mangle]
pub extern "C" fn iotclient_last_os_error() -> i32 {
    ffi_boundary(0, error::last_os_error)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_starts_empty() {
        error::clear_error_state();
        let ptr = iotclient_last_error();
        assert!(!ptr.is_null());

        // SAFETY: iotclient_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
        assert_eq!(iotclient_last_os_error(), 0);
    }

    #[test]
    fn panics_are_contained() {
        let result = ffi_boundary(IotResult::Internal, || -> IotResult { panic!("boom") });
        assert_eq!(result, IotResult::Internal);

        // SAFETY: iotclient_last_error returns a pointer to a thread-local CString.
        let text = unsafe { CStr::from_ptr(iotclient_last_error()).to_str().unwrap() };
        assert!(text.contains("panic"));
    }
}
