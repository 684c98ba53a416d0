//! Boundary to the connection-oriented byte channel used between servers.
//!
//! A [`ChannelConnector`] opens named [`Channel`]s. Channels are reliable and
//! ordered; a failed write leaves the channel unusable.

mod error;
pub use error::TransportError;

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        mod tcp;
        pub use tcp::{TcpChannel, TcpConnector};
    }
}

use crate::Endpoint;

/// Opens channels to remote servers.
pub trait ChannelConnector: Send + Sync {
    /// Opens a channel to `endpoint`. `channel_name` only serves diagnostics.
    fn connect(
        &self,
        endpoint: &Endpoint,
        channel_name: &str,
    ) -> Result<Box<dyn Channel>, TransportError>;
}

/// An open, ordered byte channel to one remote server.
pub trait Channel: Send {
    /// Human readable name used in diagnostics
    fn name(&self) -> &str;

    /// Sends a single integer, used for command codes.
    fn send_int(&mut self, value: i32) -> Result<(), TransportError>;

    /// Sends one length-delimited message.
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Closes the channel. Closing twice is a no-op.
    fn close(&mut self);
}
