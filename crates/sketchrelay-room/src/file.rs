//! A registry backed by a single JSON file.
//!
//! The file holds one object mapping room code to room:
//!
//! ```json
//! { "fox": { "code": "fox", "version": 3, "players": ["ana", "bo"], ... } }
//! ```
//!
//! Every write re-reads the document, changes one entry, writes the whole
//! thing to a uniquely named sibling temporary file, and renames it over
//! the original. A crash mid-write leaves the previous document in place.
//!
//! Each read-check-write cycle holds an exclusive OS lock on a sidecar
//! `<name>.lock` file, so registries in different processes (or several
//! instances in one process) sharing a path never both pass the same
//! version check.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use fd_lock::RwLock;
use sketchrelay_protocol::RoomCode;
use tokio::sync::Mutex;

use crate::registry::check_version;
use crate::{RegistryError, RoomRegistry, RoomState};

type Document = BTreeMap<RoomCode, RoomState>;

static NEXT_TMP: AtomicU64 = AtomicU64::new(0);

/// Stores every room in one JSON document on disk.
#[derive(Debug)]
pub struct JsonFileRegistry {
    path: PathBuf,
    // Keeps this instance's own callers off the blocking pool while one
    // of them waits on the file lock.
    lock: Mutex<()>,
}

impl JsonFileRegistry {
    /// Uses `path` as the room document. The file is created on the first
    /// write; a missing file reads as an empty store.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `op` on a blocking thread while holding the file lock.
    async fn locked<T, F>(&self, exclusive: bool, op: F) -> Result<T, RegistryError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, RegistryError> + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(sibling(&path, ".lock"))?;
            let mut lock = RwLock::new(file);
            if exclusive {
                let _held = lock.write()?;
                op(&path)
            } else {
                let _held = lock.read()?;
                op(&path)
            }
        })
        .await
        .map_err(|e| RegistryError::Io(std::io::Error::other(e)))?
    }
}

fn load(path: &Path) -> Result<Document, RegistryError> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
        Err(e) => Err(e.into()),
    }
}

fn save(path: &Path, document: &Document) -> Result<(), RegistryError> {
    let json = serde_json::to_vec_pretty(document)?;
    let seq = NEXT_TMP.fetch_add(1, Ordering::Relaxed);
    let tmp = sibling(path, &format!(".{}.{seq}.tmp", std::process::id()));
    fs::write(&tmp, json)?;
    if let Err(e) = fs::rename(&tmp, path) {
        tracing::warn!(path = %path.display(), error = %e, "room store rename failed");
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

/// `rooms.json` + `suffix`, in the same directory.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "rooms.json".into());
    name.push(suffix);
    path.with_file_name(name)
}

impl RoomRegistry for JsonFileRegistry {
    async fn get(&self, code: &RoomCode) -> Result<Option<RoomState>, RegistryError> {
        let code = code.clone();
        self.locked(false, move |path| Ok(load(path)?.remove(&code)))
            .await
    }

    async fn put(&self, state: &RoomState) -> Result<(), RegistryError> {
        let state = state.clone();
        self.locked(true, move |path| {
            let mut document = load(path)?;
            document.insert(state.code.clone(), state);
            save(path, &document)
        })
        .await
    }

    async fn put_if_version(
        &self,
        state: &RoomState,
        expected: Option<u64>,
    ) -> Result<(), RegistryError> {
        let state = state.clone();
        self.locked(true, move |path| {
            let mut document = load(path)?;
            check_version(&state.code, document.get(&state.code), expected)?;
            document.insert(state.code.clone(), state);
            save(path, &document)
        })
        .await
    }
}
