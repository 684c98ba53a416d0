pub mod autosend;
pub mod connection;
pub(crate) mod link;
pub mod reconnect_config;
pub mod request_queue;
