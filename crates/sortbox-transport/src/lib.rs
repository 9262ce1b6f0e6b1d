//! Device-node transport for sortbox.
//!
//! The mailbox is exposed at a filesystem path, the way a character device
//! node would be: access is governed by the node's permission bits, and any
//! local process that can open the path can read and write.
//!
//! This is the lowest I/O layer. Everything that talks to a device goes
//! through the [`DeviceStream`] type provided here.

pub mod error;
#[cfg(unix)]
pub mod stream;

#[cfg(unix)]
pub mod node;

pub use error::{Result, TransportError};
#[cfg(unix)]
pub use stream::{DeviceStream, PeerCredentials};

#[cfg(unix)]
pub use node::DeviceNode;
