//! # Page Server Link Shared
//! Common functionality shared between the active transaction server and the
//! page server: endpoint parsing, request envelopes, handshake codes, the
//! channel transport boundary, diagnostics reporting and log record broadcast.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

mod endpoint;
pub mod handshake;
mod log_prior;
mod report;
mod request;
pub mod transport;

pub use endpoint::{Endpoint, EndpointError};
pub use handshake::{CommandType, ServerServerCommand};
pub use log_prior::{LogPriorSender, LogRecordSink, LogRecordSource, SinkKey};
pub use report::{Diagnostic, ErrorCode, ErrorReporter, LogReporter, Severity};
pub use request::{RequestEnvelope, RequestKind, WireError};
pub use transport::{Channel, ChannelConnector, TransportError};
