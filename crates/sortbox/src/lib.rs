//! A sorted string mailbox behind a character-device style interface.
//!
//! Writers deposit byte strings; readers always take the smallest one stored.
//! Each read cycle yields exactly one string, followed by a 0-byte
//! end-of-file read. When nothing is stored a reader gets the text `"0\n"`.
//!
//! # Crate Structure
//!
//! - [`store`]: the ordered multiset of strings and its locked mailbox
//! - [`channel`]: read/write entry points with file-offset semantics
//! - [`transport`]: device nodes on Unix domain sockets
//! - [`frame`]: request/reply wire codec
//! - [`device`]: threaded device server and client file handle (behind `device` feature)

/// Re-export store types.
pub mod store {
    pub use sortbox_store::*;
}

/// Re-export channel types.
pub mod channel {
    pub use sortbox_channel::*;
}

/// Re-export transport types.
pub mod transport {
    pub use sortbox_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sortbox_frame::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use sortbox_device::*;
}
