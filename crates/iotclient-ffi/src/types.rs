use std::ffi::c_void;

use iotclient_session::{Client, ErrorKind};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IotResult {
    Ok = 0,
    InvalidArgument = 1,
    SizeExceeded = 2,
    NotFound = 3,
    BufferTooSmall = 4,
    OutOfMemory = 5,
    Io = 6,
    Closed = 7,
    Internal = 99,
}

impl From<ErrorKind> for IotResult {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidArgument => IotResult::InvalidArgument,
            ErrorKind::SizeExceeded => IotResult::SizeExceeded,
            ErrorKind::NotFound => IotResult::NotFound,
            ErrorKind::BufferTooSmall => IotResult::BufferTooSmall,
            ErrorKind::OutOfMemory => IotResult::OutOfMemory,
            ErrorKind::Io => IotResult::Io,
            ErrorKind::ClosedOrUninitialized => IotResult::Closed,
        }
    }
}

#[allow(dead_code)]
pub const IOT_OK: IotResult = IotResult::Ok;
#[allow(dead_code)]
pub const IOT_ERR_INVALID_ARGUMENT: IotResult = IotResult::InvalidArgument;
#[allow(dead_code)]
pub const IOT_ERR_SIZE_EXCEEDED: IotResult = IotResult::SizeExceeded;
#[allow(dead_code)]
pub const IOT_ERR_NOT_FOUND: IotResult = IotResult::NotFound;
#[allow(dead_code)]
pub const IOT_ERR_BUFFER_TOO_SMALL: IotResult = IotResult::BufferTooSmall;
#[allow(dead_code)]
pub const IOT_ERR_OUT_OF_MEMORY: IotResult = IotResult::OutOfMemory;
#[allow(dead_code)]
pub const IOT_ERR_IO: IotResult = IotResult::Io;
#[allow(dead_code)]
pub const IOT_ERR_CLOSED: IotResult = IotResult::Closed;
#[allow(dead_code)]
pub const IOT_ERR_INTERNAL: IotResult = IotResult::Internal;

pub type IotClientHandle = *mut c_void;

pub(crate) struct ClientHandle {
    pub(crate) client: Client,
}
