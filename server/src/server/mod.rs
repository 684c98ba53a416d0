mod active_tran_server;
pub use active_tran_server::ActiveTranServer;

mod server_config;
pub use server_config::ServerConfig;
