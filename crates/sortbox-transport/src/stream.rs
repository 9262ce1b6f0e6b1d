use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

use crate::error::Result;

/// Identity of the process on the other end of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

/// An opened device stream. Implements `Read` and `Write`.
///
/// Returned by [`crate::DeviceNode::accept`] on the serving side and by
/// [`crate::DeviceNode::connect`] on the opening side.
pub struct DeviceStream {
    inner: UnixStream,
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl DeviceStream {
    pub(crate) fn from_unix(inner: UnixStream) -> Self {
        Self { inner }
    }

    /// Connected pair, for tests and in-process plumbing.
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.inner.set_nonblocking(nonblocking).map_err(Into::into)
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        let cloned = self.inner.try_clone()?;
        Ok(Self::from_unix(cloned))
    }

    /// Close both directions of the stream.
    pub fn shutdown(&self) -> Result<()> {
        self.inner
            .shutdown(std::net::Shutdown::Both)
            .map_err(Into::into)
    }

    /// Credentials of the connected process (Linux only).
    ///
    /// Read via `SO_PEERCRED`; `None` if unavailable.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        use std::os::fd::AsRawFd;

        let fd = self.inner.as_raw_fd();
        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are valid writable pointers for the provided sizes,
        // and `fd` is an open Unix socket descriptor owned by this process.
        let rc = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        if rc == 0 && len as usize == std::mem::size_of::<libc::ucred>() {
            Some(PeerCredentials {
                uid: cred.uid,
                gid: cred.gid,
                pid: cred.pid as u32,
            })
        } else {
            None
        }
    }

    /// Credentials of the connected process.
    ///
    /// Always `None` on platforms without `SO_PEERCRED`.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        None
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream").field("type", &"unix").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_carries_bytes_both_ways() {
        let (mut left, mut right) = DeviceStream::pair().unwrap();
        left.write_all(b"ping").unwrap();
        let mut buf = [0u8; 4];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ping");

        right.write_all(b"pong").unwrap();
        left.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"pong");
    }

    #[test]
    fn shutdown_gives_eof_to_peer() {
        let (left, mut right) = DeviceStream::pair().unwrap();
        left.shutdown().unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn peer_credentials_report_own_process() {
        let (left, _right) = DeviceStream::pair().unwrap();
        let creds = left.peer_credentials().expect("linux exposes SO_PEERCRED");
        assert_eq!(creds.pid, std::process::id());
    }

    #[test]
    fn clone_shares_connection() {
        let (left, mut right) = DeviceStream::pair().unwrap();
        let mut cloned = left.try_clone().unwrap();
        cloned.write_all(b"x").unwrap();
        let mut buf = [0u8; 1];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"x");
    }
}
