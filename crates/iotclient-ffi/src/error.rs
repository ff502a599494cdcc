use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::os::raw::c_char;

use iotclient_session::ClientError;

use crate::types::IotResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
    static LAST_OS_ERROR: Cell<i32> = const { Cell::new(0) };
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| *state.borrow_mut() = CString::default());
    LAST_OS_ERROR.with(|code| code.set(0));
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> IotResult {
    set_error_message(message);
    IotResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_client_error(err: &ClientError) -> IotResult {
    set_error_message(err.to_string());
    LAST_OS_ERROR.with(|code| code.set(err.raw_os_error().unwrap_or(0)));
    err.kind().into()
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

pub(crate) fn last_os_error() -> i32 {
    LAST_OS_ERROR.with(Cell::get)
}
