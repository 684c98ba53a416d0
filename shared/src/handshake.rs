//! Command codes exchanged when a server opens a peer link to another server.
//!
//! The opening side first sends the connection class, then its local
//! identity, then the role-specific command.

/// Class of an incoming connection, sent first on every new channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandType {
    /// A server establishing a peer link with another server
    ServerServerConnect = 1,
}

impl CommandType {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Role-specific command that follows [`CommandType::ServerServerConnect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ServerServerCommand {
    ConnectActiveTranToPageServer = 0,
}

impl ServerServerCommand {
    pub fn code(self) -> i32 {
        self as i32
    }
}
