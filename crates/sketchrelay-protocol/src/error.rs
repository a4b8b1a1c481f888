//! Error types for the protocol layer.
//!
//! Each crate in SketchRelay defines its own error enum. A
//! `ProtocolError` always means a problem turning values into bytes or
//! back, never a game rule violation.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong
    /// types, or a truncated frame.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Hex text for an image payload could not be decoded.
    #[error("invalid hex payload: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The frame decoded but is not valid at the protocol level, e.g. a
    /// response body arriving where a request was expected.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
