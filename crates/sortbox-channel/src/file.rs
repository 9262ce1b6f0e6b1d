use std::io::{self, Read, Write};

use tracing::debug;

use crate::channel::Channel;

/// An opened channel with its own file position.
///
/// This is what the surrounding file plumbing hands to a caller: every
/// `read`/`write` goes through [`Channel`] with the handle's position as the
/// offset. Reading until a 0-byte result walks exactly one read cycle.
///
/// `std::io::Read::read_to_end` may probe with a small scratch buffer and
/// truncate long strings; use [`OpenFile::read_cycle`] instead.
#[derive(Debug)]
pub struct OpenFile {
    channel: Channel,
    pos: u64,
}

impl OpenFile {
    pub(crate) fn new(channel: Channel) -> Self {
        debug!("channel opened");
        Self { channel, pos: 0 }
    }

    /// Current file position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read one whole cycle with a `capacity`-byte buffer.
    pub fn read_cycle(&mut self, capacity: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; capacity];
        let mut filled = 0;
        loop {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

impl Read for OpenFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.channel.read(buf, &mut self.pos)?)
    }
}

impl Write for OpenFile {
    /// One call stores one string. Splitting a payload across calls (as
    /// `io::copy` may) stores each piece separately.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.channel.write(buf, self.pos)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        debug!(pos = self.pos, "channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChannelError;

    #[test]
    fn write_then_read_cycle() {
        let channel = Channel::new();
        let mut file = channel.open();
        file.write_all(b"cat\n").unwrap();
        file.write_all(b"ant\n").unwrap();
        assert_eq!(file.position(), 0);

        let mut reader = channel.open();
        assert_eq!(reader.read_cycle(4096).unwrap(), b"ant\n");
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_cycle(4096).unwrap(), b"cat\n");
        assert_eq!(reader.read_cycle(4096).unwrap(), b"0\n");
    }

    #[test]
    fn read_calls_alternate_data_and_eof() {
        let channel = Channel::new();
        channel.open().write_all(b"x").unwrap();

        let mut file = channel.open();
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf).unwrap(), 1);
        assert_eq!(file.position(), 1);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
        assert_eq!(file.position(), 0);
        assert_eq!(file.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"0\n");
    }

    #[test]
    fn write_errors_surface_as_io_errors() {
        let channel = Channel::new();
        let mut file = channel.open();
        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf).unwrap(), 2);
        assert_ne!(file.position(), 0);

        let err = file.write(b"late").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let inner = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<ChannelError>())
            .unwrap();
        assert_eq!(inner, &ChannelError::UnsupportedOffset(2));
    }

    #[test]
    fn small_buffer_truncates() {
        let channel = Channel::new();
        channel.open().write_all(b"abcdef").unwrap();
        let mut file = channel.open();
        assert_eq!(file.read_cycle(2).unwrap(), b"ab");
        assert!(channel.mailbox().is_empty());
    }
}
