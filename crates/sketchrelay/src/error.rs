//! Unified error type for SketchRelay.

use sketchrelay_protocol::ProtocolError;
use sketchrelay_room::RoomError;

use crate::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (bind, handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, not host, race loss, storage).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Local I/O, e.g. resolving the bound address.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The server answered a request with an error response.
    #[error("server rejected request ({code}): {message}")]
    Rejected { code: u16, message: String },
}

impl RelayError {
    /// Returns `true` if repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Room(RoomError::RaceLoss(_)) | Self::Rejected { code: 409, .. }
        )
    }
}
