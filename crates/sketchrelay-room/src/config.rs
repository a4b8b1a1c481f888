//! Room configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default number of reshuffles before falling back to a rotation.
pub const DEFAULT_RESAMPLE_ATTEMPTS: usize = 100;

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every room a [`RoomService`](crate::RoomService)
/// manages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum roster size. Joining a full room fails with
    /// [`RoomError::RoomFull`](crate::RoomError::RoomFull).
    pub max_players: usize,

    /// When the draw/guess cycle stops.
    pub termination: TerminationPolicy,

    /// How many random permutations to try before assigning by rotation.
    /// Keep it between 50 and 200; 0 always rotates.
    pub resample_attempts: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_players: 16,
            termination: TerminationPolicy::HostSignal,
            resample_attempts: DEFAULT_RESAMPLE_ATTEMPTS,
        }
    }
}

// ---------------------------------------------------------------------------
// TerminationPolicy
// ---------------------------------------------------------------------------

/// Decides when a room moves to the results phase on its own.
///
/// The host can always end the game early with `EndGame`; the policy only
/// adds an automatic stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Draw/guess repeats until the host ends the game.
    #[default]
    HostSignal,
    /// The game ends automatically once the number of completed rounds
    /// reaches the number of players, so every chain has passed through
    /// (roughly) everyone.
    RoundLimit,
}

impl TerminationPolicy {
    /// Returns `true` if a room that just completed `round` rounds with
    /// `players` players should stop.
    pub fn should_finish(self, round: u32, players: usize) -> bool {
        match self {
            Self::HostSignal => false,
            Self::RoundLimit => round as usize >= players,
        }
    }
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostSignal => write!(f, "host"),
            Self::RoundLimit => write!(f, "rounds"),
        }
    }
}

impl FromStr for TerminationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" | "host_signal" => Ok(Self::HostSignal),
            "rounds" | "round_limit" => Ok(Self::RoundLimit),
            other => Err(format!(
                "unknown termination policy {other:?} (expected \"host\" or \"rounds\")"
            )),
        }
    }
}
