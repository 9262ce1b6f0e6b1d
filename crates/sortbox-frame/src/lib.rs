//! Wire framing for device requests and replies.
//!
//! A client opening the device over its node sends one request frame per
//! read or write call and gets one reply frame back. Every frame starts
//! with the 2-byte magic "SB" for stream synchronization; the rest of the
//! header carries the caller's offset so the read-cycle protocol survives
//! the trip unchanged.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    FrameConfig, Message, Opcode, Reply, Request, DEFAULT_MAX_PAYLOAD, MAGIC,
    REPLY_HEADER_SIZE, REQUEST_HEADER_SIZE, STATUS_OK,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
