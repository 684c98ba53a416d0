use std::default::Default;

use crate::connection::reconnect_config::ReconnectConfig;

/// Contains Config properties which will be used by the active transaction
/// server when linking to a page server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Page server endpoint as `host:port`. Empty means run without a page
    /// server.
    pub page_server_hosts: String,
    /// Identity of this server (the database name), sent during the handshake
    pub local_identity: String,
    /// Name given to the page server channel, for diagnostics
    pub channel_name: String,
    /// Retry policy for explicit reconnects
    pub reconnect: ReconnectConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            page_server_hosts: String::new(),
            local_identity: String::new(),
            channel_name: "ATS_PS_comm".to_string(),
            reconnect: ReconnectConfig::default(),
        }
    }
}
