//! Shared types and wire protocol for SketchRelay.
//!
//! - **Types** ([`RoomCode`], [`PlayerName`], [`Phase`], [`Step`],
//!   [`Payload`], …) — the data every other crate talks about.
//! - **Messages** ([`Envelope`], [`Request`], [`Response`], [`RoomView`])
//!   — what travels between clients and the server.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — bytes in, bytes out.
//! - **Hex** ([`encode_hex`], [`decode_hex`]) — how drawings are stored
//!   inside JSON.
//!
//! ```text
//! Client ⇄ (Envelope<Request>/Envelope<Response>) ⇄ Server → Room engine
//! ```

mod blob;
mod codec;
mod error;
mod message;
mod types;

pub use blob::{decode_hex, encode_hex};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ChainView, Envelope, Request, Response, RoomView, SubmitOutcome, Task};
pub use types::{ItemId, Payload, Phase, PlayerName, RoomCode, Step, StepKind};
