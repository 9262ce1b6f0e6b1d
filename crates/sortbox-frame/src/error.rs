/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x5342 \"SB\")")]
    InvalidMagic,

    /// The request header names an operation this codec does not know.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A write request announced more payload than the configured maximum.
    ///
    /// Only the request header has been consumed. The caller may skip the
    /// payload with [`FrameReader::discard`](crate::FrameReader::discard)
    /// and keep using the stream.
    #[error("write payload too large ({size} bytes, max {max})")]
    WriteTooLarge { offset: u64, size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
