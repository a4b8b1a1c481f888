//! Error types for the room layer.

use sketchrelay_protocol::{PlayerName, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room is stored under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The player has never joined this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerName, RoomCode),

    /// Only the host (first player to join) may do this.
    #[error("player {0} is not the host of room {1}")]
    NotHost(PlayerName, RoomCode),

    /// The roster has reached `RoomConfig::max_players`.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The request was rejected before touching any state: empty text,
    /// empty drawing, blank name or code, or a payload of the wrong kind.
    #[error("invalid submission: {0}")]
    Validation(String),

    /// Someone else wrote the room between our read and our write.
    /// Nothing was stored; the action can be retried.
    #[error("room {0} was modified concurrently, retry")]
    RaceLoss(RoomCode),

    /// Polling gave up before the room changed.
    #[error("timed out waiting for room {0} to change")]
    PollTimeout(RoomCode),

    /// The room store failed. The stored room is unchanged.
    #[error(transparent)]
    Storage(#[from] RegistryError),
}

/// Errors reported by a [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A versioned write found a different version than expected.
    #[error("version conflict on room {code}: expected {expected:?}, found {found:?}")]
    Conflict {
        /// The room being written.
        code: RoomCode,
        /// The version the writer read (`None`: the room did not exist).
        expected: Option<u64>,
        /// The version actually stored.
        found: Option<u64>,
    },

    /// Reading or writing the backing file failed.
    #[error("room store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored document could not be encoded or decoded.
    #[error("room store is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}
