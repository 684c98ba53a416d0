use std::{fmt, panic::Location};

/// Severity of a reported [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// Identifies what went wrong, independent of the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A `host:port` configuration value could not be parsed
    HostPortParameter,
    /// Connecting or handshaking with a page server failed
    PageServerConnection,
    /// Sending a request to a connected page server failed
    PageServerSend,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::HostPortParameter => "HOST_PORT_PARAMETER",
            ErrorCode::PageServerConnection => "NET_PAGESERVER_CONNECTION",
            ErrorCode::PageServerSend => "NET_PAGESERVER_SEND",
        };
        f.write_str(name)
    }
}

/// A coded, severity-tagged message together with the place it was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    pub location: &'static Location<'static>,
}

impl Diagnostic {
    #[track_caller]
    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location: Location::caller(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}:{})",
            self.code,
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// Process-wide sink for operational diagnostics.
///
/// Reporting never aborts; callers continue in a degraded state.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Default [`ErrorReporter`], forwarding to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ErrorReporter for LogReporter {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Error => log::error!("{}", diagnostic),
        }
    }
}
