use thiserror::Error;

/// Errors that can occur on the byte channel between two servers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The channel could not be opened
    #[error("Failed to connect channel '{channel}' to {host}:{port}: {reason}")]
    ConnectFailed {
        channel: String,
        host: String,
        port: u16,
        reason: String,
    },

    /// A write on an open channel failed. The channel must not be used again
    #[error("Failed to send {len} bytes on channel '{channel}': {reason}")]
    SendFailed {
        channel: String,
        len: usize,
        reason: String,
    },

    /// The channel was already closed locally
    #[error("Channel '{channel}' is closed")]
    Closed { channel: String },
}
