use thiserror::Error;

use pslink_shared::TransportError;

/// Errors that can occur while establishing the link to a page server
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageServerError {
    /// The channel to the page server could not be opened
    #[error("Failed to connect to page server {endpoint}: {source}")]
    ConnectionFailed {
        endpoint: String,
        source: TransportError,
    },

    /// The channel opened but the server-to-server handshake failed
    #[error("Handshake with page server {endpoint} failed: {source}")]
    HandshakeFailed {
        endpoint: String,
        source: TransportError,
    },

    /// The background sender thread could not be started
    #[error("Failed to start the request sender for page server {endpoint}: {reason}")]
    AutosendSpawnFailed { endpoint: String, reason: String },

    /// Reconnect was requested but no page server endpoint is known
    #[error("No page server endpoint is configured. Cannot reconnect")]
    NoEndpoint,

    /// An explicit disconnect arrived while reconnecting
    #[error("Reconnect to page server {endpoint} was cancelled by a disconnect")]
    ReconnectCancelled { endpoint: String },

    /// Every reconnect attempt failed
    #[error("Gave up connecting to page server {endpoint} after {attempts} attempts. Last error: {last}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        last: Box<PageServerError>,
    },
}
