//! # Page Server Link Server
//! The active transaction server side of the page server link. Connects to a
//! page server, queues outbound requests and forwards committed write-ahead
//! log records to it in exactly the order they were generated.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod shared {
    pub use pslink_shared::{
        Channel, ChannelConnector, Diagnostic, Endpoint, EndpointError, ErrorCode, ErrorReporter,
        LogPriorSender, LogRecordSink, LogRecordSource, LogReporter, RequestEnvelope,
        RequestKind, Severity, SinkKey, TransportError,
    };
}

cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub use pslink_shared::transport::{TcpChannel, TcpConnector};
    }
}

mod connection;
mod error;
mod server;

pub use connection::{
    autosend::Autosend,
    connection::{ConnectionState, PageServerConnection},
    reconnect_config::ReconnectConfig,
    request_queue::{RequestQueue, RequestQueueStats},
};
pub use error::PageServerError;
pub use server::{ActiveTranServer, ServerConfig};
