/// Errors that can occur while serving or opening the device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] sortbox_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] sortbox_frame::FrameError),

    /// The device rejected a read or write; carries the errno it reported.
    #[error("device call failed (errno {errno})")]
    Remote { errno: i32 },

    /// The server configuration cannot be honored.
    #[error("invalid device configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread could not be started.
    #[error("failed to spawn connection worker: {0}")]
    Spawn(std::io::Error),

    /// The device closed the connection.
    #[error("device disconnected")]
    Disconnected,
}

impl From<DeviceError> for std::io::Error {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::Remote { errno } => std::io::Error::from_raw_os_error(errno),
            DeviceError::Frame(sortbox_frame::FrameError::Io(io))
            | DeviceError::Transport(sortbox_transport::TransportError::Io(io)) => io,
            DeviceError::Disconnected
            | DeviceError::Frame(sortbox_frame::FrameError::ConnectionClosed) => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err)
            }
            other => std::io::Error::other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;
