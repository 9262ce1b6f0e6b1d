//! Byte-stream channel over the sorted string mailbox.
//!
//! The channel keeps no per-caller state. Callers pass an offset on every
//! call and get it back updated:
//!
//! - One write at offset 0 stores exactly one string; any other offset is
//!   rejected.
//! - A read at offset 0 removes and returns the smallest string (or `"0\n"`
//!   when nothing is stored) and sets the offset to the bytes delivered.
//! - A read at a non-zero offset resets the offset and returns 0 bytes,
//!   ending the read cycle.

pub mod channel;
pub mod error;
pub mod file;
pub mod transfer;

pub use channel::{Channel, ReadPhase, DEFAULT_READ_CAPACITY, EMPTY_REPLY};
pub use error::{ChannelError, Result};
pub use file::OpenFile;
pub use transfer::{TransferFault, UserSink, UserSource, VecSink};
