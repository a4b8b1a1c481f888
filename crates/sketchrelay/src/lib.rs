//! # SketchRelay
//!
//! A drawing-telephone party game server. Players meet in a room by code,
//! each writes a prompt, and the prompts travel around the room,
//! alternately drawn and guessed, until the host ends the game and
//! everyone sees how each prompt mutated.
//!
//! This crate is the network surface: a WebSocket request/response server
//! and a matching client. The game itself lives in `sketchrelay-room`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sketchrelay::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod client;
mod error;
mod handler;
mod server;
mod store;
mod transport;

pub use client::RelayClient;
pub use error::RelayError;
pub use server::{DEFAULT_IDLE_TIMEOUT, RelayServer, RelayServerBuilder, ServerConfig};
pub use store::Store;
pub use transport::{ConnectionId, TransportError, WsConnection, WsListener};

/// Everything needed to run or talk to a server.
pub mod prelude {
    pub use crate::{RelayClient, RelayError, RelayServer, RelayServerBuilder, ServerConfig, Store};
    pub use sketchrelay_protocol::{
        ChainView, Payload, Phase, PlayerName, RoomCode, RoomView, Step, StepKind, SubmitOutcome,
        Task,
    };
    pub use sketchrelay_room::{PollConfig, RoomConfig, TerminationPolicy};
}
