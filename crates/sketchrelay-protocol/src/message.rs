//! Request/response frames and the per-player room view.
//!
//! The protocol is strictly request/response. A client never receives
//! anything it did not ask for; it learns about other players' progress
//! by sending [`Request::View`] again (polling).

use serde::{Deserialize, Serialize};

use crate::{ItemId, Payload, Phase, PlayerName, RoomCode, Step};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A numbered frame. The server echoes the request's `seq` in its reply
/// so a client can match responses to requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Client-chosen sequence number.
    pub seq: u64,
    /// The request or response.
    pub body: T,
}

impl<T> Envelope<T> {
    /// Wraps a body with the given sequence number.
    pub fn new(seq: u64, body: T) -> Self {
        Self { seq, body }
    }
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// Everything a player can ask the server to do.
///
/// Internally tagged: `{"type": "Join", "room": "fox", "name": "ana"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Join (or create) a room. Rejoining with the same name resumes.
    Join { room: RoomCode, name: PlayerName },

    /// Submit the payload for the player's current task.
    Submit {
        room: RoomCode,
        name: PlayerName,
        payload: Payload,
    },

    /// Force the room into the results phase. Host only.
    EndGame { room: RoomCode, name: PlayerName },

    /// Re-read the room. This is the polling endpoint.
    View { room: RoomCode, name: PlayerName },
}

impl Request {
    /// The room the request targets.
    pub fn room(&self) -> &RoomCode {
        match self {
            Self::Join { room, .. }
            | Self::Submit { room, .. }
            | Self::EndGame { room, .. }
            | Self::View { room, .. } => room,
        }
    }

    /// The player making the request.
    pub fn name(&self) -> &PlayerName {
        match self {
            Self::Join { name, .. }
            | Self::Submit { name, .. }
            | Self::EndGame { name, .. }
            | Self::View { name, .. } => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// The server's reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Reply to `Join`, `EndGame`, and `View`.
    Room { view: RoomView },

    /// Reply to `Submit`.
    Submitted {
        outcome: SubmitOutcome,
        view: RoomView,
    },

    /// The request failed. Codes follow HTTP conventions: 400 invalid,
    /// 403 not allowed, 404 unknown room or player, 409 conflict, 500
    /// storage failure.
    Error { code: u16, message: String },
}

/// What happened to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Recorded. `advanced` is `true` if it completed the phase.
    Accepted { advanced: bool },
    /// Nothing to do right now (already submitted, sitting out this
    /// phase, or the game is over). Not an error.
    Waiting,
}

/// One player's picture of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    pub code: RoomCode,
    /// Join order. The first entry is the host.
    pub players: Vec<PlayerName>,
    pub host: Option<PlayerName>,
    pub phase: Phase,
    /// Completed draw/guess cycles (0-based).
    pub round: u32,
    /// Players who have already submitted in the current phase.
    pub submitted: Vec<PlayerName>,
    /// What this player should do next.
    pub task: Task,
}

impl RoomView {
    /// The round number as shown to players (1-based).
    pub fn display_round(&self) -> u32 {
        self.round + 1
    }

    /// Returns `true` if `name` is the room's host.
    pub fn is_host(&self, name: &PlayerName) -> bool {
        self.host.as_ref() == Some(name)
    }
}

/// The next thing a player is asked to do. Clients render exactly one
/// screen per task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum Task {
    /// Write an original prompt.
    SubmitWord,
    /// Draw `prompt`.
    Draw { item: ItemId, prompt: String },
    /// Describe `drawing`.
    Guess {
        item: ItemId,
        #[serde(with = "crate::blob::serde_bytes")]
        drawing: Vec<u8>,
    },
    /// Waiting for other players.
    Waiting,
    /// The game is over; every chain in creation order.
    Results { chains: Vec<ChainView> },
}

/// A finished (or abandoned) relay item, for the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainView {
    pub item: ItemId,
    pub origin: PlayerName,
    pub steps: Vec<Step>,
}
