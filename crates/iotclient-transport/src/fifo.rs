use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, TransportError};

/// Block size used when forwarding a body from a reader: 8 KiB.
pub const DEFAULT_BLOCK_SIZE: usize = 8 * 1024;

/// File name prefix of every body-stream FIFO.
pub const FIFO_PREFIX: &str = "iothub_";

/// Outcome of forwarding a body from a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    /// Bytes written to the FIFO.
    pub bytes: u64,
    /// The source had more data than the limit allowed; the excess was dropped.
    pub truncated: bool,
}

/// The per-process named FIFO that carries message bodies to the hub.
///
/// The FIFO lives at `<root>/iothub_<token>`. It is opened for writing once
/// per message and closed afterwards, so the hub sees end-of-file at the end
/// of every body. The path is removed by [`remove`](Self::remove) or on drop.
#[derive(Debug)]
pub struct BodyFifo {
    path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl BodyFifo {
    /// Permission mode applied to created FIFOs, independent of the umask.
    pub const DEFAULT_FIFO_MODE: u32 = 0o666;

    /// Path of the FIFO for `token` under `root`.
    pub fn path_for(root: impl AsRef<Path>, token: u32) -> PathBuf {
        root.as_ref().join(format!("{FIFO_PREFIX}{token}"))
    }

    /// Create the FIFO for `token` under `root`.
    ///
    /// Fails if anything already exists at the path: two live clients must
    /// never share a body stream.
    pub fn create(root: impl AsRef<Path>, token: u32) -> Result<Self> {
        let path = Self::path_for(root, token);
        let create_err = |path: &Path, source: io::Error| TransportError::CreateFifo {
            path: path.to_path_buf(),
            source,
        };

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            create_err(
                &path,
                io::Error::new(ErrorKind::InvalidInput, "path contains NUL"),
            )
        })?;

        // SAFETY: `c_path` is a valid NUL-terminated path that outlives the call.
        if unsafe { libc::mkfifo(c_path.as_ptr(), Self::DEFAULT_FIFO_MODE as libc::mode_t) } == -1 {
            return Err(create_err(&path, io::Error::last_os_error()));
        }

        // The umask narrows the mkfifo mode; the hub runs as another user.
        let identity = std::fs::set_permissions(
            &path,
            std::fs::Permissions::from_mode(Self::DEFAULT_FIFO_MODE),
        )
        .and_then(|()| std::fs::symlink_metadata(&path));
        let metadata = match identity {
            Ok(metadata) => metadata,
            Err(err) => {
                let _ = std::fs::remove_file(&path);
                return Err(create_err(&path, err));
            }
        };

        debug!(?path, "created body fifo");
        Ok(Self {
            path,
            created_inode: Some((metadata.dev(), metadata.ino())),
        })
    }

    /// The FIFO path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the FIFO has already been removed.
    pub fn is_removed(&self) -> bool {
        self.created_inode.is_none()
    }

    fn open_writer(&self) -> Result<File> {
        if self.is_removed() {
            return Err(TransportError::Closed);
        }
        debug!(path = ?self.path, "opening body fifo");
        OpenOptions::new()
            .write(true)
            .open(&self.path)
            .map_err(|source| TransportError::OpenFifo {
                path: self.path.clone(),
                source,
            })
    }

    /// Write one complete body and close the FIFO.
    ///
    /// Blocks until the hub opens the other end. The body goes out in a
    /// single write; a short write is reported as
    /// [`TransportError::PartialWrite`].
    pub fn write_body(&self, body: &[u8]) -> Result<()> {
        let mut out = self.open_writer()?;
        let written = out.write(body)?;
        if written != body.len() {
            return Err(TransportError::PartialWrite {
                written,
                expected: body.len(),
            });
        }
        debug!(bytes = written, "wrote body");
        Ok(())
    }

    /// Forward `source` to the FIFO in blocks of `block_size` bytes, then close it.
    ///
    /// Stops at end-of-source or once `limit` bytes have been forwarded. Data
    /// past the limit is dropped and flagged in the returned report.
    pub fn stream_from<R: Read + ?Sized>(
        &self,
        source: &mut R,
        limit: u64,
        block_size: usize,
    ) -> Result<StreamReport> {
        let mut out = self.open_writer()?;
        let mut block = vec![0u8; block_size.max(1)];
        let mut report = StreamReport {
            bytes: 0,
            truncated: false,
        };

        loop {
            let read = match source.read(&mut block) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            };

            let remaining = limit - report.bytes;
            let take = (read as u64).min(remaining) as usize;
            if take > 0 {
                out.write_all(&block[..take])?;
                report.bytes += take as u64;
            }
            if take < read {
                report.truncated = true;
                break;
            }
        }

        if report.truncated {
            warn!(limit, "body stream truncated at size limit");
        }
        debug!(bytes = report.bytes, "streamed body");
        Ok(report)
    }

    /// Remove the FIFO from the filesystem. Removing twice is a no-op.
    ///
    /// The path is left alone if something else has replaced the FIFO.
    pub fn remove(&mut self) {
        let Some((expected_dev, expected_ino)) = self.created_inode.take() else {
            return;
        };

        match std::fs::symlink_metadata(&self.path) {
            Ok(metadata)
                if metadata.file_type().is_fifo()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino =>
            {
                match std::fs::remove_file(&self.path) {
                    Ok(()) => debug!(path = ?self.path, "removed body fifo"),
                    Err(err) => warn!(path = ?self.path, %err, "failed to remove body fifo"),
                }
            }
            Ok(_) => debug!(path = ?self.path, "fifo path identity changed; skipping cleanup"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(path = ?self.path, %err, "failed to inspect body fifo"),
        }
    }
}

impl Drop for BodyFifo {
    fn drop(&mut self) {
        self.remove();
    }
}
