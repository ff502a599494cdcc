use std::ffi::CString;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::{ControlChannel, InboundChannel};

/// A named POSIX message queue (`mq_open(3)`).
///
/// The queue descriptor is closed on [`close`](Self::close) or drop. The
/// queue name itself outlives the descriptor; use [`unlink`](Self::unlink)
/// to remove it.
#[derive(Debug)]
pub struct MessageQueue {
    mqd: libc::mqd_t,
    name: String,
    max_messages: usize,
    max_message_size: usize,
}

impl MessageQueue {
    /// Permission mode for queues created by [`create_reader`](Self::create_reader).
    pub const DEFAULT_QUEUE_MODE: u32 = 0o666;
    /// Longest queue name accepted, including the leading `/`.
    const MAX_NAME_LEN: usize = 255;

    /// Open an existing queue for writing.
    ///
    /// The message size limit is read back from the queue itself.
    pub fn open_writer(name: &str) -> Result<Self> {
        let name = normalize_name(name)?;
        let c_name = c_name(&name)?;

        // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call.
        let mqd = unsafe { libc::mq_open(c_name.as_ptr(), libc::O_WRONLY) };
        if mqd == -1 {
            return Err(TransportError::Open {
                name,
                source: io::Error::last_os_error(),
            });
        }

        let queue = Self::with_attributes(mqd, name)?;
        debug!(
            name = %queue.name,
            max_message_size = queue.max_message_size,
            "opened message queue for writing"
        );
        Ok(queue)
    }

    /// Open a queue for reading, creating it if it does not exist.
    ///
    /// A freshly created queue holds up to `max_messages` messages of at most
    /// `max_message_size` bytes. An existing queue keeps its own attributes,
    /// which are reported by [`max_message_size`](InboundChannel::max_message_size).
    pub fn create_reader(name: &str, max_messages: usize, max_message_size: usize) -> Result<Self> {
        if max_messages == 0 {
            return Err(TransportError::InvalidAttributes("max_messages must be non-zero"));
        }
        if max_message_size == 0 {
            return Err(TransportError::InvalidAttributes(
                "max_message_size must be non-zero",
            ));
        }
        let maxmsg = libc::c_long::try_from(max_messages)
            .map_err(|_| TransportError::InvalidAttributes("max_messages out of range"))?;
        let msgsize = libc::c_long::try_from(max_message_size)
            .map_err(|_| TransportError::InvalidAttributes("max_message_size out of range"))?;

        let name = normalize_name(name)?;
        let c_name = c_name(&name)?;

        // SAFETY: `mq_attr` is a plain C struct for which all-zero is a valid value.
        let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
        attr.mq_maxmsg = maxmsg as _;
        attr.mq_msgsize = msgsize as _;

        // SAFETY: `c_name` is NUL-terminated and `attr` is a valid, initialized
        // `mq_attr`; both outlive the call. The variadic mode/attr arguments are
        // required because `O_CREAT` is set.
        let mqd = unsafe {
            libc::mq_open(
                c_name.as_ptr(),
                libc::O_RDONLY | libc::O_CREAT,
                Self::DEFAULT_QUEUE_MODE as libc::mode_t,
                &mut attr as *mut libc::mq_attr,
            )
        };
        if mqd == -1 {
            return Err(TransportError::Open {
                name,
                source: io::Error::last_os_error(),
            });
        }

        let queue = Self::with_attributes(mqd, name)?;
        debug!(
            name = %queue.name,
            max_messages = queue.max_messages,
            max_message_size = queue.max_message_size,
            "opened message queue for reading"
        );
        Ok(queue)
    }

    /// Remove a queue name. A name that does not exist is not an error.
    pub fn unlink(name: &str) -> Result<()> {
        let name = normalize_name(name)?;
        let c_name = c_name(&name)?;

        // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call.
        if unsafe { libc::mq_unlink(c_name.as_ptr()) } == -1 {
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::NotFound {
                return Err(TransportError::Io(err));
            }
        }
        debug!(%name, "unlinked message queue");
        Ok(())
    }

    fn with_attributes(mqd: libc::mqd_t, name: String) -> Result<Self> {
        let mut queue = Self {
            mqd,
            name,
            max_messages: 0,
            max_message_size: 0,
        };
        // On failure `queue` is dropped here, which closes the descriptor.
        let attr = queue.attributes()?;
        queue.max_messages = usize::try_from(attr.mq_maxmsg).unwrap_or(0);
        queue.max_message_size = usize::try_from(attr.mq_msgsize).unwrap_or(0);
        Ok(queue)
    }

    fn attributes(&self) -> Result<libc::mq_attr> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        // SAFETY: all-zero is a valid `mq_attr`.
        let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
        // SAFETY: `self.mqd` is an open queue descriptor and `attr` is writable.
        if unsafe { libc::mq_getattr(self.mqd, &mut attr) } == -1 {
            return Err(TransportError::Attributes {
                name: self.name.clone(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(attr)
    }

    /// Number of messages currently waiting in the queue.
    pub fn pending(&self) -> Result<usize> {
        let attr = self.attributes()?;
        Ok(usize::try_from(attr.mq_curmsgs).unwrap_or(0))
    }

    /// The normalized queue name (always starts with `/`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Largest message the queue carries, as reported by the kernel.
    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Queue capacity in messages.
    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Whether the descriptor has been closed.
    pub fn is_closed(&self) -> bool {
        self.mqd == -1
    }

    /// Close the queue descriptor. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }
        // SAFETY: `self.mqd` is an open descriptor owned by this value and is
        // invalidated immediately afterwards.
        unsafe {
            libc::mq_close(self.mqd);
        }
        self.mqd = -1;
        debug!(name = %self.name, "closed message queue");
    }
}

impl ControlChannel for MessageQueue {
    fn max_message_size(&self) -> usize {
        MessageQueue::max_message_size(self)
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if message.len() > self.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: message.len(),
                max: self.max_message_size,
            });
        }

        // SAFETY: `message` is valid for `message.len()` bytes for the duration
        // of the call and `self.mqd` is open.
        let rc = unsafe {
            libc::mq_send(
                self.mqd,
                message.as_ptr().cast::<libc::c_char>(),
                message.len(),
                0,
            )
        };
        if rc == -1 {
            return Err(TransportError::Io(io::Error::last_os_error()));
        }
        Ok(())
    }
}

impl InboundChannel for MessageQueue {
    fn max_message_size(&self) -> usize {
        MessageQueue::max_message_size(self)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let deadline = timeout.map(realtime_deadline);

        loop {
            let mut priority: libc::c_uint = 0;
            // SAFETY: `buf` is writable for `buf.len()` bytes, `priority` and the
            // optional deadline are valid for the call, and `self.mqd` is open.
            let n = unsafe {
                match &deadline {
                    Some(at) => libc::mq_timedreceive(
                        self.mqd,
                        buf.as_mut_ptr().cast::<libc::c_char>(),
                        buf.len(),
                        &mut priority,
                        at,
                    ),
                    None => libc::mq_receive(
                        self.mqd,
                        buf.as_mut_ptr().cast::<libc::c_char>(),
                        buf.len(),
                        &mut priority,
                    ),
                }
            };

            if n >= 0 {
                return Ok(n as usize);
            }
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(TransportError::Io(err));
        }
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        self.close();
    }
}

/// Absolute `CLOCK_REALTIME` deadline `timeout` from now, as `mq_timedreceive` expects.
fn realtime_deadline(timeout: Duration) -> libc::timespec {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let at = now.saturating_add(timeout);

    // SAFETY: all-zero is a valid `timespec`.
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    // Deadlines past the representable range saturate instead of wrapping negative.
    ts.tv_sec = libc::time_t::try_from(at.as_secs()).unwrap_or(libc::time_t::MAX);
    ts.tv_nsec = at.subsec_nanos() as _;
    ts
}

/// Bring a queue name into `/name` form and reject names the kernel would refuse.
pub(crate) fn normalize_name(name: &str) -> Result<String> {
    let invalid = |reason| TransportError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let bare = name.strip_prefix('/').unwrap_or(name);
    if bare.is_empty() {
        return Err(invalid("name is empty"));
    }
    if bare.contains('/') {
        return Err(invalid("only a single leading '/' is allowed"));
    }
    if bare.contains('\0') {
        return Err(invalid("name contains NUL"));
    }
    if bare.len() + 1 > MessageQueue::MAX_NAME_LEN {
        return Err(invalid("name too long"));
    }
    Ok(format!("/{bare}"))
}

fn c_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| TransportError::InvalidName {
        name: name.to_string(),
        reason: "name contains NUL",
    })
}
