use std::io::{self, Read, Write};
use std::path::Path;

use bytes::Bytes;
use sortbox_frame::{FrameConfig, FrameError, FrameReader, FrameWriter, Reply, Request};
use sortbox_transport::{DeviceNode, DeviceStream};
use tracing::debug;

use crate::error::{DeviceError, Result};

/// An opened device, seen from the caller's side.
///
/// The file position lives here and travels with every request; the reply
/// carries it back updated. That makes this the "typical consumer" of the
/// read-cycle protocol: read until a 0-byte result and you have exactly one
/// string.
pub struct DeviceFile {
    reader: FrameReader<DeviceStream>,
    writer: FrameWriter<DeviceStream>,
    pos: u64,
}

impl DeviceFile {
    /// Open the device node at `path` with default frame limits.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, FrameConfig::default())
    }

    /// Open the device node at `path` with explicit frame limits and timeouts.
    pub fn open_with_config(path: impl AsRef<Path>, config: FrameConfig) -> Result<Self> {
        let stream = DeviceNode::connect(path)?;
        let reader_stream = stream.try_clone()?;
        Ok(Self {
            reader: FrameReader::with_config_device(reader_stream, config.clone())?,
            writer: FrameWriter::with_config_device(stream, config)?,
            pos: 0,
        })
    }

    /// Current file position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Send one request and wait for its reply.
    ///
    /// The reply's offset becomes the new file position, whether or not the
    /// call succeeded.
    fn call(&mut self, request: Request) -> Result<Reply> {
        self.writer.send(&request)?;
        let reply: Reply = self.reader.read_frame().map_err(|err| match err {
            FrameError::ConnectionClosed => DeviceError::Disconnected,
            other => other.into(),
        })?;
        self.pos = reply.offset;
        if !reply.is_ok() {
            debug!(errno = reply.status, "device call rejected");
            return Err(DeviceError::Remote {
                errno: i32::from(reply.status),
            });
        }
        Ok(reply)
    }

    /// Store `bytes` as one string at the current position.
    pub fn write_string(&mut self, bytes: &[u8]) -> Result<usize> {
        let reply = self.call(Request::Write {
            offset: self.pos,
            payload: Bytes::copy_from_slice(bytes),
        })?;
        Ok(reply.count as usize)
    }

    /// Issue one read call with a `capacity`-byte buffer.
    pub fn read_once(&mut self, capacity: usize) -> Result<Bytes> {
        let reply = self.call(Request::Read {
            offset: self.pos,
            capacity: u32::try_from(capacity).unwrap_or(u32::MAX),
        })?;
        Ok(reply.payload)
    }

    /// Read one whole cycle: the next string (or the empty reply), up to
    /// `capacity` bytes. Reply bytes beyond the requested capacity are dropped.
    pub fn read_cycle(&mut self, capacity: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let remaining = capacity.saturating_sub(out.len());
            let chunk = self.read_once(remaining)?;
            if chunk.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
        }
    }
}

impl Read for DeviceFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let chunk = self.read_once(buf.len())?;
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

impl Write for DeviceFile {
    /// One call stores one string.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_string(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for DeviceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceFile").field("pos", &self.pos).finish()
    }
}
