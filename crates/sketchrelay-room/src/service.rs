//! Room service: the load → apply → store cycle around the engine.
//!
//! This is the entry point for higher layers (the WebSocket server, tests).
//! Each mutating call:
//!
//! 1. takes the per-room lock, so actions on one room never interleave in
//!    this process;
//! 2. loads the room from the registry;
//! 3. applies the action with the [`RelayEngine`];
//! 4. stores the room with a versioned write if anything changed.
//!
//! The versioned write catches writers outside this process. If the stored
//! version moved, nothing is written and the caller gets
//! [`RoomError::RaceLoss`].

use std::collections::HashMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sketchrelay_protocol::{Payload, PlayerName, RoomCode, RoomView, SubmitOutcome};
use tokio::sync::Mutex;

use crate::{Action, Effect, RegistryError, RelayEngine, RoomConfig, RoomError, RoomRegistry, RoomState};

/// Runs room actions against a [`RoomRegistry`].
pub struct RoomService<R: RoomRegistry> {
    registry: R,
    engine: RelayEngine,
    /// One lock per room code with an action in flight.
    locks: Mutex<HashMap<RoomCode, Arc<Mutex<()>>>>,
    rng: Mutex<StdRng>,
}

impl<R: RoomRegistry> RoomService<R> {
    /// Creates a service with an RNG seeded from the OS.
    pub fn new(registry: R, config: RoomConfig) -> Self {
        Self::with_rng(registry, config, StdRng::from_os_rng())
    }

    /// Creates a service with a caller-supplied RNG (deterministic tests).
    pub fn with_rng(registry: R, config: RoomConfig, rng: StdRng) -> Self {
        Self {
            registry,
            engine: RelayEngine::new(config),
            locks: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &RoomConfig {
        self.engine.config()
    }

    /// Joins `name` to room `code`, creating the room on first use.
    ///
    /// Joining again with the same name resumes that player.
    pub async fn join(&self, code: &RoomCode, name: &PlayerName) -> Result<RoomView, RoomError> {
        validate_ids(code, name)?;
        let (_, state) = self.act(code, Action::Join { name: name.clone() }).await?;
        state.view_for(name)
    }

    /// Submits the payload for the current phase.
    pub async fn submit(
        &self,
        code: &RoomCode,
        name: &PlayerName,
        payload: Payload,
    ) -> Result<(SubmitOutcome, RoomView), RoomError> {
        validate_ids(code, name)?;
        if payload.is_blank() {
            return Err(RoomError::Validation("submission is empty".into()));
        }

        let action = Action::Submit {
            name: name.clone(),
            payload,
        };
        let (effect, state) = self.act(code, action).await?;
        let outcome = match effect {
            Effect::Submitted(outcome) => outcome,
            _ => SubmitOutcome::Waiting,
        };
        Ok((outcome, state.view_for(name)?))
    }

    /// Ends the game. Host only.
    pub async fn end_game(&self, code: &RoomCode, name: &PlayerName) -> Result<RoomView, RoomError> {
        validate_ids(code, name)?;
        let (_, state) = self.act(code, Action::EndGame { name: name.clone() }).await?;
        state.view_for(name)
    }

    /// What `name` sees in room `code` right now. Read-only.
    pub async fn view(&self, code: &RoomCode, name: &PlayerName) -> Result<RoomView, RoomError> {
        validate_ids(code, name)?;
        self.state(code).await?.view_for(name)
    }

    /// The full stored room.
    pub async fn state(&self, code: &RoomCode) -> Result<RoomState, RoomError> {
        self.registry
            .get(code)
            .await?
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    async fn room_lock(&self, code: &RoomCode) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(code.clone()).or_default().clone()
    }

    /// Drops the entry for `code` once nobody else holds or waits on it.
    async fn release_lock(&self, code: &RoomCode) {
        let mut locks = self.locks.lock().await;
        if locks.get(code).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(code);
        }
    }

    async fn act(&self, code: &RoomCode, action: Action) -> Result<(Effect, RoomState), RoomError> {
        let lock = self.room_lock(code).await;
        let result = {
            let _guard = lock.lock().await;
            self.act_locked(code, action).await
        };
        drop(lock);
        self.release_lock(code).await;
        result
    }

    async fn act_locked(
        &self,
        code: &RoomCode,
        action: Action,
    ) -> Result<(Effect, RoomState), RoomError> {
        let loaded = self.registry.get(code).await?;
        let expected = loaded.as_ref().map(|state| state.version);
        let mut state = match loaded {
            Some(state) => state,
            None if matches!(action, Action::Join { .. }) => RoomState::new(code.clone()),
            None => return Err(RoomError::NotFound(code.clone())),
        };

        let effect = {
            let mut rng = self.rng.lock().await;
            self.engine.apply(&mut state, action, &mut *rng)?
        };
        if !effect.mutated() {
            return Ok((effect, state));
        }

        state.version = expected.map_or(1, |v| v + 1);
        self.registry
            .put_if_version(&state, expected)
            .await
            .map_err(|e| match e {
                RegistryError::Conflict { code, found, .. } => {
                    tracing::debug!(room = %code, ?expected, ?found, "lost write race");
                    RoomError::RaceLoss(code)
                }
                other => {
                    tracing::error!(room = %state.code, error = %other, "room store write failed");
                    RoomError::Storage(other)
                }
            })?;

        if expected.is_none() {
            tracing::info!(room = %code, "room created");
        }
        Ok((effect, state))
    }
}

fn validate_ids(code: &RoomCode, name: &PlayerName) -> Result<(), RoomError> {
    if code.is_blank() {
        return Err(RoomError::Validation("room code is empty".into()));
    }
    if name.is_blank() {
        return Err(RoomError::Validation("player name is empty".into()));
    }
    Ok(())
}
