pub type Result<T> = std::result::Result<T, Error>;

/// An error with adapter communication
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error from the underlying [Transport](crate::transport::Transport)
    #[error("Transport error: `{0}`")]
    Transport(#[from] crate::transport::Error),

    /// Serial transport support was not compiled in (`serialport_comm` feature)
    #[error("No serial transport available; rebuild with the `serialport_comm` feature")]
    TransportUnavailable,
}
