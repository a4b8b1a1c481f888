//! The registry the binary runs with: in memory, or a JSON file.

use std::path::PathBuf;

use sketchrelay_protocol::RoomCode;
use sketchrelay_room::{JsonFileRegistry, MemoryRegistry, RegistryError, RoomRegistry, RoomState};

/// Either registry shipped with `sketchrelay-room`, picked at startup.
#[derive(Debug)]
pub enum Store {
    Memory(MemoryRegistry),
    File(JsonFileRegistry),
}

impl Store {
    /// A file store at `path`, or an in-memory one for `None`.
    pub fn open(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "using json room store");
                Self::File(JsonFileRegistry::new(path))
            }
            None => {
                tracing::info!("using in-memory room store");
                Self::Memory(MemoryRegistry::new())
            }
        }
    }
}

impl RoomRegistry for Store {
    async fn get(&self, code: &RoomCode) -> Result<Option<RoomState>, RegistryError> {
        match self {
            Self::Memory(r) => r.get(code).await,
            Self::File(r) => r.get(code).await,
        }
    }

    async fn put(&self, state: &RoomState) -> Result<(), RegistryError> {
        match self {
            Self::Memory(r) => r.put(state).await,
            Self::File(r) => r.put(state).await,
        }
    }

    async fn put_if_version(
        &self,
        state: &RoomState,
        expected: Option<u64>,
    ) -> Result<(), RegistryError> {
        match self {
            Self::Memory(r) => r.put_if_version(state, expected).await,
            Self::File(r) => r.put_if_version(state, expected).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_picks_backend() {
        assert!(matches!(Store::open(None), Store::Memory(_)));
        assert!(matches!(
            Store::open(Some(PathBuf::from("rooms.json"))),
            Store::File(_)
        ));
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(Some(dir.path().join("rooms.json")));
        let state = RoomState::new(RoomCode::new("fox"));

        store.put_if_version(&state, None).await.unwrap();
        assert_eq!(store.get(&RoomCode::new("fox")).await.unwrap(), Some(state));
    }
}
