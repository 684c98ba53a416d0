use std::convert::TryFrom;

use thiserror::Error;

const KIND_BYTES: usize = 4;

/// Errors that can occur while decoding a request frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Frame is shorter than the request kind header
    #[error("Request frame of {len} bytes is too short to hold the {} byte request kind", KIND_BYTES)]
    TruncatedFrame { len: usize },

    /// Request kind code is not one this side knows about
    #[error("Unknown request kind code {code}. This may indicate a protocol version mismatch")]
    UnknownRequestKind { code: i32 },
}

/// Requests sent by an active transaction server to a page server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RequestKind {
    /// A batch of write-ahead log records, in generation order
    ForwardLogRecords = 0,
}

impl RequestKind {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for RequestKind {
    type Error = WireError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RequestKind::ForwardLogRecords),
            _ => Err(WireError::UnknownRequestKind { code }),
        }
    }
}

/// One tagged request with its opaque payload, the unit of transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    kind: RequestKind,
    payload: Vec<u8>,
}

impl RequestEnvelope {
    pub fn new(kind: RequestKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Encodes the envelope as `[kind: i32 BE][payload]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(KIND_BYTES + self.payload.len());
        frame.extend_from_slice(&self.kind.code().to_be_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }

    /// Decodes a frame produced by [`RequestEnvelope::encode`].
    pub fn decode(frame: &[u8]) -> Result<Self, WireError> {
        let (header, payload) = frame
            .split_first_chunk::<KIND_BYTES>()
            .ok_or(WireError::TruncatedFrame { len: frame.len() })?;
        let kind = RequestKind::try_from(i32::from_be_bytes(*header))?;
        Ok(Self::new(kind, payload.to_vec()))
    }
}
