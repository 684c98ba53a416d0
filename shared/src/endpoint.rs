use std::fmt;

use thiserror::Error;

const HOST_PORT_SEPARATOR: char = ':';

/// Errors that can occur while parsing a `host:port` page server endpoint
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// No `:` separator in the endpoint string
    #[error("Endpoint '{input}' has no ':' separator. Expected the form host:port")]
    MissingSeparator { input: String },

    /// The separator is the first character, so there is no host
    #[error("Endpoint '{input}' has an empty host. Expected the form host:port")]
    EmptyHost { input: String },

    /// The separator is the last character, so there is no port
    #[error("Endpoint '{input}' has an empty port. Expected the form host:port")]
    EmptyPort { input: String },

    /// The port is not a decimal number
    #[error("Endpoint '{input}' has a non-numeric port '{port}'")]
    InvalidPort { input: String, port: String },

    /// The port is a number but not in 1..=65535
    #[error("Endpoint '{input}' has port '{port}' outside of the valid range 1-65535")]
    PortOutOfRange { input: String, port: String },
}

/// Host and port of a page server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    hostname: String,
    port: u16,
}

impl Endpoint {
    /// Builds an endpoint from already validated parts.
    ///
    /// # Panics
    ///
    /// Panics if `port` is zero or `hostname` is empty.
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        let hostname = hostname.into();
        assert!(!hostname.is_empty(), "endpoint hostname must not be empty");
        assert!(port != 0, "endpoint port must be in 1..=65535");
        Self { hostname, port }
    }

    /// Parses a page server configuration string of the form `host:port`.
    ///
    /// An empty string means no page server is configured and yields
    /// `Ok(None)`. Anything else that is not a well formed `host:port` pair
    /// yields an [`EndpointError`]. The host ends at the first `:`, and the
    /// port must consist of ASCII digits only (no sign, no whitespace).
    pub fn parse(input: &str) -> Result<Option<Self>, EndpointError> {
        if input.is_empty() {
            return Ok(None);
        }

        let Some(separator) = input.find(HOST_PORT_SEPARATOR) else {
            return Err(EndpointError::MissingSeparator {
                input: input.to_string(),
            });
        };
        if separator == 0 {
            return Err(EndpointError::EmptyHost {
                input: input.to_string(),
            });
        }
        if separator == input.len() - HOST_PORT_SEPARATOR.len_utf8() {
            return Err(EndpointError::EmptyPort {
                input: input.to_string(),
            });
        }

        let hostname = &input[..separator];
        let port_str = &input[separator + HOST_PORT_SEPARATOR.len_utf8()..];
        let port = parse_port(port_str).map_err(|out_of_range| {
            let input = input.to_string();
            let port = port_str.to_string();
            if out_of_range {
                EndpointError::PortOutOfRange { input, port }
            } else {
                EndpointError::InvalidPort { input, port }
            }
        })?;

        Ok(Some(Self {
            hostname: hostname.to_string(),
            port,
        }))
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

// Err(true) when the digits are valid but out of range
fn parse_port(port: &str) -> Result<u16, bool> {
    if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return Err(false);
    }
    let trimmed = port.trim_start_matches('0');
    // more than five significant digits can never fit, and would overflow u32 parsing
    if trimmed.len() > 5 {
        return Err(true);
    }
    let value: u32 = if trimmed.is_empty() {
        0
    } else {
        trimmed.parse().map_err(|_| false)?
    };
    match u16::try_from(value) {
        Ok(0) | Err(_) => Err(true),
        Ok(port) => Ok(port),
    }
}
