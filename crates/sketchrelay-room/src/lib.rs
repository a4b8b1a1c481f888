//! Rooms for SketchRelay.
//!
//! A room is a stored [`RoomState`]: the roster, the current phase, and
//! every relay item's chain of words, drawings, and guesses. Nothing runs
//! in the background. Rooms only move when a player acts.
//!
//! # Key types
//!
//! - [`RelayEngine`] — the phase state machine and item assignment
//! - [`RoomService`] — load, apply, and store one action at a time
//! - [`RoomRegistry`] — where rooms live ([`MemoryRegistry`],
//!   [`JsonFileRegistry`])
//! - [`RoomConfig`] — player limit, termination policy, shuffle budget
//! - [`poll_until_changed`] — wait for other players without push

#![allow(async_fn_in_trait)]

mod assign;
mod config;
mod engine;
mod error;
mod file;
mod poll;
mod registry;
mod service;
mod state;
mod view;

pub use assign::{Derangement, derange};
pub use config::{DEFAULT_RESAMPLE_ATTEMPTS, RoomConfig, TerminationPolicy};
pub use engine::{Action, Effect, RelayEngine};
pub use error::{RegistryError, RoomError};
pub use file::JsonFileRegistry;
pub use poll::{MIN_POLL_INTERVAL, PollConfig, has_changed, poll_until_changed};
pub use registry::{MemoryRegistry, RoomRegistry};
pub use service::RoomService;
pub use state::{RelayItem, RoomState};
