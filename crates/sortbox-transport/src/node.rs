use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::DeviceStream;

/// A device node backed by a filesystem-path Unix domain socket.
///
/// The node file carries the permission bits that gate who may open the
/// device. It is removed on drop, but only if it is still the file this
/// node created.
pub struct DeviceNode {
    listener: UnixListener,
    path: PathBuf,
    created_inode: (u64, u64),
}

impl DeviceNode {
    /// Default permission mode: owner only.
    pub const DEFAULT_MODE: u32 = 0o600;
    /// Mode that lets every local user read and write.
    pub const SHARED_MODE: u32 = 0o666;
    /// Maximum node path length.
    /// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Create the node at `path` with [`DeviceNode::DEFAULT_MODE`].
    ///
    /// A stale socket left at `path` is removed first; any other kind of
    /// file makes the bind fail.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_MODE)
    }

    /// Create the node at `path` with explicit permission bits.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let path_bytes = path.as_os_str().len();
        if path_bytes >= Self::MAX_PATH_LEN {
            return Err(TransportError::PathTooLong {
                path,
                len: path_bytes,
                max: Self::MAX_PATH_LEN,
            });
        }

        let bind_err = |source: std::io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        // Never remove anything that is not a socket.
        if let Ok(metadata) = std::fs::symlink_metadata(&path) {
            if !metadata.file_type().is_socket() {
                return Err(bind_err(std::io::Error::new(
                    ErrorKind::AlreadyExists,
                    "existing path is not a device socket",
                )));
            }
            debug!(?path, "removing stale device node");
            std::fs::remove_file(&path).map_err(bind_err)?;
        }

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let created = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, mode = format_args!("{mode:o}"), "device node created");

        Ok(Self {
            listener,
            path,
            created_inode: (created.dev(), created.ino()),
        })
    }

    /// Accept the next open (blocking).
    pub fn accept(&self) -> Result<DeviceStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("device opened");
        Ok(DeviceStream::from_unix(stream))
    }

    /// Accept the next open if one is pending.
    ///
    /// Only meaningful after `set_nonblocking(true)`; returns `Ok(None)`
    /// when nothing is waiting. Accepted streams are always blocking.
    pub fn try_accept(&self) -> Result<Option<DeviceStream>> {
        match self.listener.accept() {
            Ok((stream, _addr)) => {
                stream.set_nonblocking(false)?;
                debug!("device opened");
                Ok(Some(DeviceStream::from_unix(stream)))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
            Err(err) => Err(TransportError::Accept(err)),
        }
    }

    /// Switch the accept side between blocking and polling.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener
            .set_nonblocking(nonblocking)
            .map_err(Into::into)
    }

    /// Open the device node at `path` (blocking).
    pub fn connect(path: impl AsRef<Path>) -> Result<DeviceStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "opened device node");
        Ok(DeviceStream::from_unix(stream))
    }

    /// The path of the node file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeviceNode {
    fn drop(&mut self) {
        let (expected_dev, expected_ino) = self.created_inode;
        if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
            if metadata.file_type().is_socket()
                && metadata.dev() == expected_dev
                && metadata.ino() == expected_ino
            {
                debug!(path = ?self.path, "removing device node");
                let _ = std::fs::remove_file(&self.path);
            } else {
                debug!(
                    path = ?self.path,
                    "device node identity changed; skipping cleanup"
                );
            }
        }
    }
}

impl std::fmt::Debug for DeviceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceNode")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sortbox-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_bind_accept_connect() {
        let dir = temp_dir("node");
        let node_path = dir.join("chardev");

        let node = DeviceNode::bind(&node_path).unwrap();
        assert!(node_path.exists());

        let path_clone = node_path.clone();
        let handle = std::thread::spawn(move || {
            let mut client = DeviceNode::connect(&path_clone).unwrap();
            client.write_all(b"hello").unwrap();
        });

        let mut server = node.accept().unwrap();
        let mut buf = [0u8; 5];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        handle.join().unwrap();

        drop(node);
        assert!(!node_path.exists(), "node file should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_path_too_long() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200);
        let result = DeviceNode::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn test_default_mode_is_owner_only() {
        let dir = temp_dir("mode-default");
        let node_path = dir.join("chardev");

        let node = DeviceNode::bind(&node_path).unwrap();
        let mode = std::fs::metadata(&node_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(node);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_shared_mode_applied() {
        let dir = temp_dir("mode-shared");
        let node_path = dir.join("chardev");

        let node = DeviceNode::bind_with_mode(&node_path, DeviceNode::SHARED_MODE).unwrap();
        let mode = std::fs::metadata(&node_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o666);

        drop(node);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_bind_rejects_existing_regular_file() {
        let dir = temp_dir("bind-file");
        let node_path = dir.join("not-a-node");
        std::fs::write(&node_path, b"regular-file").unwrap();

        let result = DeviceNode::bind(&node_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(node_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rebind_replaces_stale_node() {
        let dir = temp_dir("stale");
        let node_path = dir.join("chardev");

        let first = DeviceNode::bind(&node_path).unwrap();
        std::mem::forget(first);
        let second = DeviceNode::bind(&node_path).unwrap();
        assert!(node_path.exists());

        drop(second);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_drop_does_not_remove_replaced_path() {
        let dir = temp_dir("drop-race");
        let node_path = dir.join("chardev");

        let node = DeviceNode::bind(&node_path).unwrap();
        std::fs::remove_file(&node_path).unwrap();
        std::fs::write(&node_path, b"replacement-file").unwrap();

        drop(node);
        assert!(
            node_path.exists(),
            "drop must not remove path if inode identity changed"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_try_accept_without_pending_open() {
        let dir = temp_dir("try-accept");
        let node_path = dir.join("chardev");

        let node = DeviceNode::bind(&node_path).unwrap();
        node.set_nonblocking(true).unwrap();
        assert!(node.try_accept().unwrap().is_none());

        let _client = DeviceNode::connect(&node_path).unwrap();
        let mut accepted = None;
        for _ in 0..100 {
            accepted = node.try_accept().unwrap();
            if accepted.is_some() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(accepted.is_some());

        drop(node);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_connect_missing_node_fails() {
        let dir = temp_dir("missing");
        let result = DeviceNode::connect(dir.join("absent"));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
