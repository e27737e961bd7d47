#![deny(warnings)]

//! Persistence layer: versioned game snapshots.
//!
//! Callers load a snapshot, compute on it, then commit with the version they
//! loaded. A commit against a stale version fails, so two writers of the same
//! game can never silently overwrite each other. Only this crate touches
//! storage; engines and resolvers work on plain values.

use sectors_core::GameId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info};

/// Monotonic version of a stored game, starting at 1 on create.
pub type Version = u64;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(GameId),
    #[error("{0} already exists")]
    AlreadyExists(GameId),
    #[error("{game} was committed concurrently: expected version {expected}, found {found}")]
    VersionConflict { game: GameId, expected: Version, found: Version },
    #[error("snapshot codec: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("store io: {0}")]
    Io(#[from] io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// A loaded value and the version it was read at.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<T> {
    pub version: Version,
    pub value: T,
}

/// Snapshot/commit boundary for game state.
pub trait GameStore<T> {
    /// Store a new game at version 1.
    fn create(&self, game: GameId, value: &T) -> Result<Version, StoreError>;
    fn load(&self, game: GameId) -> Result<Snapshot<T>, StoreError>;
    /// Replace the game if it is still at `expected`; returns the new version.
    fn commit(&self, game: GameId, expected: Version, value: &T) -> Result<Version, StoreError>;
}

/// In-process arena of serialized games. Loads decode fresh copies.
#[derive(Debug, Default)]
pub struct MemoryStore {
    games: RwLock<BTreeMap<GameId, (Version, Vec<u8>)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Serialize + DeserializeOwned> GameStore<T> for MemoryStore {
    fn create(&self, game: GameId, value: &T) -> Result<Version, StoreError> {
        let bytes = serde_json::to_vec(value)?;
        let mut games = self.games.write().map_err(|_| StoreError::Poisoned)?;
        if games.contains_key(&game) {
            return Err(StoreError::AlreadyExists(game));
        }
        games.insert(game, (1, bytes));
        info!(%game, "game created");
        Ok(1)
    }

    fn load(&self, game: GameId) -> Result<Snapshot<T>, StoreError> {
        let games = self.games.read().map_err(|_| StoreError::Poisoned)?;
        let (version, bytes) = games.get(&game).ok_or(StoreError::NotFound(game))?;
        Ok(Snapshot { version: *version, value: serde_json::from_slice(bytes)? })
    }

    fn commit(&self, game: GameId, expected: Version, value: &T) -> Result<Version, StoreError> {
        let bytes = serde_json::to_vec(value)?;
        let mut games = self.games.write().map_err(|_| StoreError::Poisoned)?;
        let entry = games.get_mut(&game).ok_or(StoreError::NotFound(game))?;
        if entry.0 != expected {
            return Err(StoreError::VersionConflict { game, expected, found: entry.0 });
        }
        *entry = (expected + 1, bytes);
        debug!(%game, version = expected + 1, "game committed");
        Ok(expected + 1)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredGame<T> {
    version: Version,
    value: T,
}

/// One JSON file per game under a directory. Writes go to a temp file and
/// are renamed into place.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, write_lock: Mutex::new(()) })
    }

    pub fn path_for(&self, game: GameId) -> PathBuf {
        self.dir.join(format!("{game}.json"))
    }

    fn read_stored<T: DeserializeOwned>(&self, game: GameId) -> Result<StoredGame<T>, StoreError> {
        let text = match fs::read(self.path_for(game)) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NotFound(game)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&text)?)
    }

    fn write_stored<T: Serialize>(&self, game: GameId, version: Version, value: &T) -> Result<(), StoreError> {
        let path = self.path_for(game);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&StoredGame { version, value })?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl<T: Serialize + DeserializeOwned> GameStore<T> for JsonFileStore {
    fn create(&self, game: GameId, value: &T) -> Result<Version, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        if self.path_for(game).exists() {
            return Err(StoreError::AlreadyExists(game));
        }
        self.write_stored(game, 1, value)?;
        info!(%game, path = %self.path_for(game).display(), "game saved");
        Ok(1)
    }

    fn load(&self, game: GameId) -> Result<Snapshot<T>, StoreError> {
        let stored: StoredGame<T> = self.read_stored(game)?;
        Ok(Snapshot { version: stored.version, value: stored.value })
    }

    fn commit(&self, game: GameId, expected: Version, value: &T) -> Result<Version, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let found = self.read_stored::<serde_json::Value>(game)?.version;
        if found != expected {
            return Err(StoreError::VersionConflict { game, expected, found });
        }
        self.write_stored(game, expected + 1, value)?;
        debug!(%game, version = expected + 1, "game committed");
        Ok(expected + 1)
    }
}
