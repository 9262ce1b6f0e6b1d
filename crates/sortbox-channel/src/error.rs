use sortbox_store::StoreError;

use crate::transfer::TransferFault;

/// Errors reported by channel reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Writes are only accepted at offset 0.
    #[error("write offset {0} not supported")]
    UnsupportedOffset(u64),

    /// The cell for an incoming string could not be allocated.
    #[error("out of memory allocating a {requested}-byte cell")]
    OutOfMemory { requested: usize },

    /// The copy-in or copy-out primitive reported a fault.
    #[error(transparent)]
    TransferFault(#[from] TransferFault),
}

impl ChannelError {
    /// POSIX errno reported for this error at the device boundary.
    pub fn errno(&self) -> i32 {
        match self {
            ChannelError::UnsupportedOffset(_) => libc::EINVAL,
            ChannelError::OutOfMemory { .. } => libc::ENOMEM,
            ChannelError::TransferFault(_) => libc::EFAULT,
        }
    }

    /// Map to the closest `std::io::ErrorKind`.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            ChannelError::UnsupportedOffset(_) => std::io::ErrorKind::InvalidInput,
            ChannelError::OutOfMemory { .. } => std::io::ErrorKind::OutOfMemory,
            ChannelError::TransferFault(_) => std::io::ErrorKind::Other,
        }
    }
}

impl From<StoreError> for ChannelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OutOfMemory { requested } => ChannelError::OutOfMemory { requested },
        }
    }
}

impl From<ChannelError> for std::io::Error {
    fn from(err: ChannelError) -> Self {
        std::io::Error::new(err.io_kind(), err)
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
