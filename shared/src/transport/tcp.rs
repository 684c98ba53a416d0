use std::{
    io::Write,
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use log::{debug, info};

use super::{Channel, ChannelConnector, TransportError};
use crate::Endpoint;

/// Opens [`TcpChannel`]s.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    /// Per-address connect timeout. `None` uses the operating system default
    pub connect_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        Self { connect_timeout }
    }

    fn connect_addr(&self, addr: &SocketAddr) -> std::io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl ChannelConnector for TcpConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        channel_name: &str,
    ) -> Result<Box<dyn Channel>, TransportError> {
        let connect_failed = |reason: String| TransportError::ConnectFailed {
            channel: channel_name.to_string(),
            host: endpoint.hostname().to_string(),
            port: endpoint.port(),
            reason,
        };

        let addrs = (endpoint.hostname(), endpoint.port())
            .to_socket_addrs()
            .map_err(|e| connect_failed(format!("address resolution failed: {}", e)))?;

        let mut last_error = String::from("host resolved to no addresses");
        for addr in addrs {
            match self.connect_addr(&addr) {
                Ok(stream) => {
                    stream
                        .set_nodelay(true)
                        .map_err(|e| connect_failed(e.to_string()))?;
                    info!("Channel '{}' connected to {} ({})", channel_name, endpoint, addr);
                    return Ok(Box::new(TcpChannel::new(channel_name, stream)));
                }
                Err(e) => {
                    debug!("Channel '{}' failed to connect to {}: {}", channel_name, addr, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(connect_failed(last_error))
    }
}

/// Channel over a blocking TCP stream.
///
/// `send_int` writes 4 bytes big-endian; `send` writes a 4 byte big-endian
/// length followed by the payload.
pub struct TcpChannel {
    name: String,
    stream: Option<TcpStream>,
}

impl TcpChannel {
    pub fn new(name: &str, stream: TcpStream) -> Self {
        Self {
            name: name.to_string(),
            stream: Some(stream),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::Closed {
                channel: self.name.clone(),
            });
        };
        stream
            .write_all(bytes)
            .and_then(|_| stream.flush())
            .map_err(|e| TransportError::SendFailed {
                channel: self.name.clone(),
                len: bytes.len(),
                reason: e.to_string(),
            })
    }
}

impl Channel for TcpChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_int(&mut self, value: i32) -> Result<(), TransportError> {
        self.write_all(&value.to_be_bytes())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let len = u32::try_from(payload.len()).map_err(|_| TransportError::SendFailed {
            channel: self.name.clone(),
            len: payload.len(),
            reason: "message exceeds the 4 GiB frame limit".to_string(),
        })?;
        let mut frame = Vec::with_capacity(4 + payload.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(payload);
        self.write_all(&frame)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // peer may already be gone
            let _ = stream.shutdown(Shutdown::Both);
            debug!("Channel '{}' closed", self.name);
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.close();
    }
}
