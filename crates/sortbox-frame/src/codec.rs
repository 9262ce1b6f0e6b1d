use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Magic bytes: "SB" (0x53 0x42).
pub const MAGIC: [u8; 2] = [0x53, 0x42];

/// Request header: magic (2) + opcode (1) + offset (8) + length (4) = 15 bytes.
pub const REQUEST_HEADER_SIZE: usize = 15;

/// Reply header: magic (2) + status (1) + offset (8) + count (4) + payload length (4) = 19 bytes.
pub const REPLY_HEADER_SIZE: usize = 19;

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Reply status for a successful call. Any other value is a POSIX errno.
pub const STATUS_OK: u8 = 0;

/// Operation carried by a request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Read = 1,
    Write = 2,
}

impl TryFrom<u8> for Opcode {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Opcode::Read),
            2 => Ok(Opcode::Write),
            other => Err(FrameError::UnknownOpcode(other)),
        }
    }
}

/// One read or write call, as issued by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Read into a buffer of `capacity` bytes at `offset`.
    Read { offset: u64, capacity: u32 },
    /// Store `payload` as one string, at `offset`.
    Write { offset: u64, payload: Bytes },
}

/// Outcome of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// [`STATUS_OK`] or an errno.
    pub status: u8,
    /// The caller's offset after the call.
    pub offset: u64,
    /// Bytes accepted (write) or delivered (read).
    pub count: u32,
    /// Delivered bytes; empty for writes and errors.
    pub payload: Bytes,
}

impl Reply {
    /// Successful read delivering `payload`.
    pub fn read_ok(offset: u64, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            status: STATUS_OK,
            offset,
            count: u32::try_from(payload.len()).unwrap_or(u32::MAX),
            payload,
        }
    }

    /// Successful write accepting `count` bytes.
    pub fn write_ok(offset: u64, count: u32) -> Self {
        Self {
            status: STATUS_OK,
            offset,
            count,
            payload: Bytes::new(),
        }
    }

    /// Failed call.
    pub fn error(errno: u8, offset: u64) -> Self {
        Self {
            status: errno,
            offset,
            count: 0,
            payload: Bytes::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// A frame that can be put on and taken off the wire.
pub trait Message: Sized {
    /// Append the encoded frame to `dst`.
    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    /// Decode one frame from the front of `src`.
    ///
    /// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
    /// On success, consumes the frame bytes from the buffer.
    fn decode(src: &mut BytesMut, max_payload: usize) -> Result<Option<Self>>;

    /// Payload bytes this frame carries on the wire.
    fn payload_len(&self) -> usize;
}

fn check_payload_len(len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(FrameError::PayloadTooLarge { size: len, max });
    }
    Ok(())
}

fn wire_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| FrameError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}

/// Request wire format:
/// ```text
/// ┌────────────┬──────────┬───────────┬───────────┬─────────────────────┐
/// │ Magic (2B) │ Op (1B)  │ Offset    │ Length    │ Payload             │
/// │ "SB"       │ 1 / 2    │ (8B LE)   │ (4B LE)   │ (write only)        │
/// └────────────┴──────────┴───────────┴───────────┴─────────────────────┘
/// ```
/// For reads, `Length` is the caller's buffer capacity and no payload follows.
impl Message for Request {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let (opcode, offset, length, payload): (Opcode, u64, u32, &[u8]) = match self {
            Request::Read { offset, capacity } => {
                (Opcode::Read, *offset, *capacity, b"".as_slice())
            }
            Request::Write { offset, payload } => {
                (Opcode::Write, *offset, wire_len(payload.len())?, payload.as_ref())
            }
        };
        dst.reserve(REQUEST_HEADER_SIZE + payload.len());
        dst.put_slice(&MAGIC);
        dst.put_u8(opcode as u8);
        dst.put_u64_le(offset);
        dst.put_u32_le(length);
        dst.put_slice(payload);
        Ok(())
    }

    fn decode(src: &mut BytesMut, max_payload: usize) -> Result<Option<Self>> {
        if src.len() < REQUEST_HEADER_SIZE {
            return Ok(None); // Need more data
        }
        if src[0..2] != MAGIC {
            return Err(FrameError::InvalidMagic);
        }

        let mut header = &src[2..REQUEST_HEADER_SIZE];
        let opcode = Opcode::try_from(header.get_u8())?;
        let offset = header.get_u64_le();
        let length = header.get_u32_le();

        match opcode {
            Opcode::Read => {
                src.advance(REQUEST_HEADER_SIZE);
                Ok(Some(Request::Read {
                    offset,
                    capacity: length,
                }))
            }
            Opcode::Write => {
                let payload_len = length as usize;
                if payload_len > max_payload {
                    src.advance(REQUEST_HEADER_SIZE);
                    return Err(FrameError::WriteTooLarge {
                        offset,
                        size: payload_len,
                        max: max_payload,
                    });
                }
                if src.len() < REQUEST_HEADER_SIZE + payload_len {
                    return Ok(None); // Need more data
                }
                src.advance(REQUEST_HEADER_SIZE);
                let payload = src.split_to(payload_len).freeze();
                Ok(Some(Request::Write { offset, payload }))
            }
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            Request::Read { .. } => 0,
            Request::Write { payload, .. } => payload.len(),
        }
    }
}

/// Reply wire format:
/// ```text
/// ┌────────────┬────────────┬───────────┬───────────┬───────────┬──────────────┐
/// │ Magic (2B) │ Status (1B)│ Offset    │ Count     │ Length    │ Payload      │
/// │ "SB"       │ 0 or errno │ (8B LE)   │ (4B LE)   │ (4B LE)   │ (Length B)   │
/// └────────────┴────────────┴───────────┴───────────┴───────────┴──────────────┘
/// ```
impl Message for Reply {
    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        let length = wire_len(self.payload.len())?;
        dst.reserve(REPLY_HEADER_SIZE + self.payload.len());
        dst.put_slice(&MAGIC);
        dst.put_u8(self.status);
        dst.put_u64_le(self.offset);
        dst.put_u32_le(self.count);
        dst.put_u32_le(length);
        dst.put_slice(&self.payload);
        Ok(())
    }

    fn decode(src: &mut BytesMut, max_payload: usize) -> Result<Option<Self>> {
        if src.len() < REPLY_HEADER_SIZE {
            return Ok(None); // Need more data
        }
        if src[0..2] != MAGIC {
            return Err(FrameError::InvalidMagic);
        }

        let mut header = &src[2..REPLY_HEADER_SIZE];
        let status = header.get_u8();
        let offset = header.get_u64_le();
        let count = header.get_u32_le();
        let payload_len = header.get_u32_le() as usize;

        check_payload_len(payload_len, max_payload)?;
        if src.len() < REPLY_HEADER_SIZE + payload_len {
            return Ok(None); // Need more data
        }

        src.advance(REPLY_HEADER_SIZE);
        let payload = src.split_to(payload_len).freeze();
        Ok(Some(Reply {
            status,
            offset,
            count,
            payload,
        }))
    }

    fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_request_layout() {
        let mut buf = BytesMut::new();
        Request::Write {
            offset: 0,
            payload: Bytes::from_static(b"cat\n"),
        }
        .encode(&mut buf)
        .unwrap();

        assert_eq!(buf.len(), REQUEST_HEADER_SIZE + 4);
        assert_eq!(&buf[0..2], b"SB");
        assert_eq!(buf[2], Opcode::Write as u8);
        assert_eq!(&buf[3..11], &0u64.to_le_bytes());
        assert_eq!(&buf[11..15], &4u32.to_le_bytes());
        assert_eq!(&buf[15..], b"cat\n");
    }

    #[test]
    fn test_read_request_has_no_payload() {
        let mut buf = BytesMut::new();
        let request = Request::Read {
            offset: 3,
            capacity: 4096,
        };
        request.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), REQUEST_HEADER_SIZE);

        let decoded = Request::decode(&mut buf, 16).unwrap().unwrap();
        assert_eq!(decoded, request);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_read_capacity_not_bounded_by_max_payload() {
        let mut buf = BytesMut::new();
        Request::Read {
            offset: 0,
            capacity: u32::MAX,
        }
        .encode(&mut buf)
        .unwrap();
        assert!(Request::decode(&mut buf, 16).unwrap().is_some());
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&b"SB\x01"[..]);
        assert!(Request::decode(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert!(Reply::decode(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        Request::Write {
            offset: 0,
            payload: Bytes::from_static(b"hello"),
        }
        .encode(&mut buf)
        .unwrap();
        buf.truncate(REQUEST_HEADER_SIZE + 2);

        assert!(Request::decode(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0xFF; REPLY_HEADER_SIZE][..]);
        assert!(matches!(
            Request::decode(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(FrameError::InvalidMagic)
        ));
        assert!(matches!(
            Reply::decode(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(FrameError::InvalidMagic)
        ));
    }

    #[test]
    fn test_decode_unknown_opcode() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(9);
        buf.put_u64_le(0);
        buf.put_u32_le(0);

        assert!(matches!(
            Request::decode(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(FrameError::UnknownOpcode(9))
        ));
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(Opcode::Write as u8);
        buf.put_u64_le(0);
        buf.put_u32_le(1024 * 1024 * 32);
        buf.put_slice(b"first payload bytes");

        assert!(matches!(
            Request::decode(&mut buf, DEFAULT_MAX_PAYLOAD),
            Err(FrameError::WriteTooLarge {
                offset: 0,
                size: 33_554_432,
                max: DEFAULT_MAX_PAYLOAD,
            })
        ));
        // Header consumed, payload left for the caller to skip.
        assert_eq!(buf.as_ref(), b"first payload bytes");
    }

    #[test]
    fn test_decode_reply_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(STATUS_OK);
        buf.put_u64_le(0);
        buf.put_u32_le(64);
        buf.put_u32_le(64);

        assert!(matches!(
            Reply::decode(&mut buf, 16),
            Err(FrameError::PayloadTooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn test_reply_carries_status_offset_and_data() {
        let mut buf = BytesMut::new();
        Reply::read_ok(3, Bytes::from_static(b"dog")).encode(&mut buf).unwrap();
        Reply::error(22, 0).encode(&mut buf).unwrap();
        Reply::write_ok(0, 5).encode(&mut buf).unwrap();

        let read = Reply::decode(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(read.is_ok());
        assert_eq!((read.offset, read.count), (3, 3));
        assert_eq!(read.payload.as_ref(), b"dog");

        let failed = Reply::decode(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert!(!failed.is_ok());
        assert_eq!(failed.status, 22);

        let written = Reply::decode(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!(written.count, 5);
        assert!(written.payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_payload_len() {
        let write = Request::Write {
            offset: 0,
            payload: Bytes::from_static(b"four"),
        };
        assert_eq!(write.payload_len(), 4);
        assert_eq!(
            Request::Read {
                offset: 0,
                capacity: 99
            }
            .payload_len(),
            0
        );
    }
}
