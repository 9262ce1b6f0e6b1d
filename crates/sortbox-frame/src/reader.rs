use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
#[cfg(unix)]
use sortbox_transport::DeviceStream;

use crate::codec::{FrameConfig, Message};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame of type `M` (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame<M: Message>(&mut self) -> Result<M> {
        loop {
            if let Some(frame) = M::decode(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Skip the next `len` payload bytes, whether already buffered or not.
    ///
    /// Used after [`FrameError::WriteTooLarge`] to realign on the next frame.
    pub fn discard(&mut self, len: usize) -> Result<()> {
        let buffered = len.min(self.buf.len());
        self.buf.advance(buffered);

        let mut remaining = len - buffered;
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        while remaining > 0 {
            let want = remaining.min(READ_CHUNK_SIZE);
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => remaining -= n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        Ok(())
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(unix)]
impl FrameReader<DeviceStream> {
    /// Create a frame reader for `DeviceStream` and apply read timeout from config.
    pub fn with_config_device(inner: DeviceStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(unix)]
pub(crate) fn transport_to_frame_error(err: sortbox_transport::TransportError) -> FrameError {
    match err {
        sortbox_transport::TransportError::Io(io)
        | sortbox_transport::TransportError::Accept(io) => FrameError::Io(io),
        sortbox_transport::TransportError::Bind { source, .. }
        | sortbox_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
