pub mod local_socket;

pub use helpers::*;
pub use local_socket::{ChannelRecord, RecordingConnector, SendGate, WireEvent, HANDSHAKE_EVENTS};
