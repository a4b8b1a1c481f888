//! Room storage.
//!
//! The core never talks to a database directly. It loads and stores whole
//! [`RoomState`] values through the [`RoomRegistry`] trait, keyed by room
//! code. Two implementations ship with the crate:
//!
//! - [`MemoryRegistry`]: a shared in-process map, for tests and for servers
//!   that don't need rooms to survive a restart.
//! - [`JsonFileRegistry`](crate::JsonFileRegistry): one JSON document on
//!   disk, replaced atomically on every write.
//!
//! # Versioned writes
//!
//! Every stored room carries a `version`. [`RoomRegistry::put_if_version`]
//! only writes if the stored version is still the one the caller loaded,
//! so two processes sharing a store cannot silently overwrite each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use sketchrelay_protocol::RoomCode;
use tokio::sync::Mutex;

use crate::{RegistryError, RoomState};

/// Loads and stores rooms by code.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one registry is shared by every connection
///   task for the lifetime of the server.
/// - The returned futures are `Send` so callers can hold them across
///   `.await` inside `tokio::spawn`.
pub trait RoomRegistry: Send + Sync + 'static {
    /// Returns the stored room, or `None` if the code was never used.
    fn get(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<Option<RoomState>, RegistryError>> + Send;

    /// Stores the room unconditionally. Last write wins.
    fn put(&self, state: &RoomState) -> impl Future<Output = Result<(), RegistryError>> + Send;

    /// Stores the room only if the currently stored version is `expected`.
    ///
    /// `expected = None` means the room must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] if someone else wrote first.
    fn put_if_version(
        &self,
        state: &RoomState,
        expected: Option<u64>,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

/// Checks a stored version against the expected one.
pub(crate) fn check_version(
    code: &RoomCode,
    stored: Option<&RoomState>,
    expected: Option<u64>,
) -> Result<(), RegistryError> {
    let found = stored.map(|state| state.version);
    if found == expected {
        Ok(())
    } else {
        Err(RegistryError::Conflict {
            code: code.clone(),
            expected,
            found,
        })
    }
}

/// In-memory registry. Cloning shares the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    rooms: Arc<Mutex<HashMap<RoomCode, RoomState>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms.
    pub async fn len(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.lock().await.is_empty()
    }
}

impl RoomRegistry for MemoryRegistry {
    async fn get(&self, code: &RoomCode) -> Result<Option<RoomState>, RegistryError> {
        Ok(self.rooms.lock().await.get(code).cloned())
    }

    async fn put(&self, state: &RoomState) -> Result<(), RegistryError> {
        self.rooms
            .lock()
            .await
            .insert(state.code.clone(), state.clone());
        Ok(())
    }

    async fn put_if_version(
        &self,
        state: &RoomState,
        expected: Option<u64>,
    ) -> Result<(), RegistryError> {
        let mut rooms = self.rooms.lock().await;
        check_version(&state.code, rooms.get(&state.code), expected)?;
        rooms.insert(state.code.clone(), state.clone());
        Ok(())
    }
}
