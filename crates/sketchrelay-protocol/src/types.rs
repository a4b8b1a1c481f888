//! Core data types shared by the relay engine, the store, and the wire.
//!
//! Everything in this module is serializable: the same structures are
//! persisted in the room store and sent to clients inside a
//! [`RoomView`](crate::RoomView).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The code players type to meet in the same room.
///
/// Codes are chosen by players, not generated. Two groups that pick the
/// same code end up in the same room. The code is stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Creates a room code, trimming surrounding whitespace.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_string())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the code is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

// Deserialization goes through here, so wire values are trimmed too.
impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

/// A player's self-declared display name.
///
/// Names are the only player identity: there is no authentication, and
/// a name is unique within a room because joining with an existing name
/// resumes that player instead of adding a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PlayerName(String);

impl PlayerName {
    /// Creates a player name, trimming surrounding whitespace.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the name is empty after trimming.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// Deserialization goes through here, so wire values are trimmed too.
impl From<String> for PlayerName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<PlayerName> for String {
    fn from(name: PlayerName) -> Self {
        name.0
    }
}

/// Stable identity of a relay item.
///
/// Built from the prompt author and the room's item sequence number,
/// e.g. `alice#0`. Sequence numbers are never reused within a room, so
/// an id stays unique even if the same player authors several prompts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Derives the id for the `seq`-th item of a room, authored by `origin`.
    pub fn new(origin: &PlayerName, seq: u64) -> Self {
        Self(format!("{origin}#{seq}"))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Phase — the room's state-machine cursor
// ---------------------------------------------------------------------------

/// The stage a room is in.
///
/// ```text
/// Word → Draw → Guess → Draw → Guess → … → Results
/// ```
///
/// - **Word**: every player writes an original prompt.
/// - **Draw**: each player draws the prompt or guess assigned to them.
/// - **Guess**: each player describes the drawing assigned to them.
/// - **Results**: terminal. Chains are revealed, nothing more is accepted.
///
/// Serialized in lowercase (`"word"`, `"draw"`, …) to match the stored
/// room layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Word,
    Draw,
    Guess,
    Results,
}

impl Phase {
    /// The phase that follows once every participant has submitted.
    ///
    /// `Guess` loops back to `Draw`; ending the game is decided by the
    /// engine's termination policy, not here. `Results` has no successor.
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Word => Some(Self::Draw),
            Self::Draw => Some(Self::Guess),
            Self::Guess => Some(Self::Draw),
            Self::Results => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    ///
    /// Any running phase may jump to `Results` (end of game).
    pub fn can_transition_to(self, target: Self) -> bool {
        match target {
            Self::Results => !self.is_finished(),
            _ => self.successor() == Some(target),
        }
    }

    /// Returns `true` once the game is over.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Results)
    }

    /// The kind of chain step a submission in this phase produces.
    pub fn step_kind(self) -> Option<StepKind> {
        match self {
            Self::Word => Some(StepKind::Word),
            Self::Draw => Some(StepKind::Drawing),
            Self::Guess => Some(StepKind::Guess),
            Self::Results => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word => write!(f, "word"),
            Self::Draw => write!(f, "draw"),
            Self::Guess => write!(f, "guess"),
            Self::Results => write!(f, "results"),
        }
    }
}

// ---------------------------------------------------------------------------
// Chain steps
// ---------------------------------------------------------------------------

/// What a chain step contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// The original prompt. Only ever the first step of a chain.
    Word,
    /// A picture of the previous text step.
    Drawing,
    /// A text description of the previous drawing.
    Guess,
}

impl StepKind {
    /// The kind that must follow this one in a chain.
    pub fn next(self) -> Self {
        match self {
            Self::Word | Self::Guess => Self::Drawing,
            Self::Drawing => Self::Guess,
        }
    }

    /// Returns `true` if the step carries an image rather than text.
    pub fn is_image(self) -> bool {
        matches!(self, Self::Drawing)
    }
}

/// A submitted payload: text for prompts and guesses, raw image bytes
/// for drawings.
///
/// Image bytes are encoded as lowercase hex so they fit inside the JSON
/// room document: `{"image": "89504e47…"}`. Text is `{"text": "cat"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Text(String),
    Image(#[serde(with = "crate::blob::serde_bytes")] Vec<u8>),
}

impl Payload {
    /// Returns `true` for an image payload.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Returns `true` if there is nothing meaningful in the payload:
    /// whitespace-only text or zero image bytes.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Image(bytes) => bytes.is_empty(),
        }
    }

    /// Returns the text, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::Image(_) => None,
        }
    }

    /// Returns the image bytes, if this is an image payload.
    pub fn as_image(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Image(bytes) => Some(bytes.as_slice()),
        }
    }

    /// Returns the payload with surrounding whitespace removed from text.
    pub fn normalized(self) -> Self {
        match self {
            Self::Text(text) => Self::Text(text.trim().to_string()),
            image => image,
        }
    }
}

/// One entry in a relay item's provenance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// What this step contains.
    pub kind: StepKind,
    /// Who produced it.
    pub author: PlayerName,
    /// The submitted content.
    pub payload: Payload,
}
