use log::{debug, info};

use pslink_shared::{
    Channel, ChannelConnector, CommandType, Endpoint, RequestEnvelope, ServerServerCommand,
    TransportError,
};

use crate::error::PageServerError;

/// Lifecycle of the link to a page server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Channel open, handshake not yet complete
    Connecting,
    /// Handshake complete, requests may flow
    Connected,
    /// A send failed; nothing more will be sent on this channel
    Failed,
}

/// An established channel to one page server.
pub struct PageServerConnection {
    channel: Box<dyn Channel>,
    endpoint: Endpoint,
    state: ConnectionState,
}

impl PageServerConnection {
    /// Opens a channel to `endpoint` and performs the server-to-server
    /// handshake. A channel that fails the handshake is closed and dropped.
    pub fn connect(
        connector: &dyn ChannelConnector,
        endpoint: &Endpoint,
        local_identity: &str,
        channel_name: &str,
    ) -> Result<Self, PageServerError> {
        let channel = connector.connect(endpoint, channel_name).map_err(|source| {
            PageServerError::ConnectionFailed {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        let mut connection = Self {
            channel,
            endpoint: endpoint.clone(),
            state: ConnectionState::Connecting,
        };

        if let Err(source) = connection.handshake(local_identity) {
            connection.channel.close();
            return Err(PageServerError::HandshakeFailed {
                endpoint: endpoint.to_string(),
                source,
            });
        }

        connection.state = ConnectionState::Connected;
        info!(
            "Channel '{}' connected to page server {}",
            connection.channel.name(),
            endpoint
        );
        Ok(connection)
    }

    fn handshake(&mut self, local_identity: &str) -> Result<(), TransportError> {
        self.channel.send_int(CommandType::ServerServerConnect.code())?;
        self.channel.send(local_identity.as_bytes())?;
        self.channel
            .send_int(ServerServerCommand::ConnectActiveTranToPageServer.code())
    }

    /// Sends one request as a single frame.
    ///
    /// A failure moves the connection to [`ConnectionState::Failed`] and every
    /// later call fails without touching the channel.
    pub fn send_request(&mut self, envelope: &RequestEnvelope) -> Result<(), TransportError> {
        if self.state != ConnectionState::Connected {
            return Err(TransportError::Closed {
                channel: self.channel.name().to_string(),
            });
        }

        let frame = envelope.encode();
        match self.channel.send(&frame) {
            Ok(()) => {
                debug!(
                    "Sent {:?} request ({} bytes) on '{}'",
                    envelope.kind(),
                    frame.len(),
                    self.channel.name()
                );
                Ok(())
            }
            Err(error) => {
                self.state = ConnectionState::Failed;
                Err(error)
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn close(mut self) {
        self.channel.close();
        info!(
            "Channel '{}' to page server {} closed",
            self.channel.name(),
            self.endpoint
        );
    }
}
