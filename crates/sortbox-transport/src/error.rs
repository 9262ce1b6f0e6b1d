use std::path::PathBuf;

/// Errors that can occur while creating or opening a device node.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to create the node at the specified path.
    #[error("failed to bind device node {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open the node at the specified path.
    #[error("failed to open device node {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to accept an incoming open.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The node path is too long for the platform.
    #[error("device path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, TransportError>;
