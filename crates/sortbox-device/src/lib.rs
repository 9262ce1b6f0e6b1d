//! Device server and client for the sortbox mailbox.
//!
//! The server owns the one shared [`Channel`](sortbox_channel::Channel) and
//! plays the role of the file plumbing: it creates the device node, accepts
//! opens, and dispatches each read/write request with the offset the caller
//! supplied. The client side, [`DeviceFile`], keeps the file position and
//! echoes it back on every call, so reading until EOF walks one read cycle.

#[cfg(unix)]
pub mod client;
pub mod error;
#[cfg(unix)]
pub mod server;

#[cfg(unix)]
pub use client::DeviceFile;
pub use error::{DeviceError, Result};
#[cfg(unix)]
pub use server::{dispatch, handle_connection, DeviceConfig, DeviceServer};
