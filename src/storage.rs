use crate::config::atomic_rename;
use crate::model::{GameState, Language, PlayerContext, SaveRecord, Stage};
use crate::sim::{ActionKind, Transition};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};
use thiserror::Error;
use tracing::{debug, info, warn};

pub(crate) const GAME_STATE_KEY: &str = "nero_game_state";
pub(crate) const LANGUAGE_KEY: &str = "nero_language";

#[derive(Debug, Error)]
pub(crate) enum StorageError {
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value persistence, shaped like a browser's local storage.
pub(crate) trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub(crate) type SharedStore = Rc<dyn KeyValueStore>;

pub(crate) fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub(crate) fn save_json<T: Serialize>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let data = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &data)
}

/* -----------------------------
   Backends
------------------------------ */

/// One file per key inside a directory; writes go through a temp file and a rename.
#[derive(Clone, Debug)]
pub(crate) struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub(crate) fn open(dir: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(dir).map_err(|source| StorageError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        atomic_rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    map: RefCell<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }
}

/* -----------------------------
   Game state store
------------------------------ */

/// Owns the session's [`GameState`] and writes it through on every change.
pub(crate) struct GameStore {
    store: SharedStore,
    state: GameState,
    lang: Language,
}

impl GameStore {
    pub(crate) fn open(store: SharedStore) -> Self {
        Self::open_with_language(store, Language::default())
    }

    /// Like [`GameStore::open`], using `fallback` when no language was saved.
    pub(crate) fn open_with_language(store: SharedStore, fallback: Language) -> Self {
        let state = match load_json::<SaveRecord>(store.as_ref(), GAME_STATE_KEY) {
            Ok(Some(record)) => GameState::from(record),
            Ok(None) => GameState::default(),
            Err(e) => {
                warn!(error = %e, "failed to load game state, starting fresh");
                GameState::default()
            }
        };
        let lang = match load_json::<Language>(store.as_ref(), LANGUAGE_KEY) {
            Ok(v) => v.unwrap_or(fallback),
            Err(e) => {
                warn!(error = %e, "failed to load language");
                fallback
            }
        };
        info!(
            sync_rate = state.sync_rate(),
            corruption = state.corruption(),
            energy = state.energy(),
            stage = state.stage().as_str(),
            "game state restored"
        );
        Self { store, state, lang }
    }

    pub(crate) fn state(&self) -> GameState {
        self.state
    }

    pub(crate) fn language(&self) -> Language {
        self.lang
    }

    pub(crate) fn execute_action(
        &mut self,
        kind: ActionKind,
        ctx: Option<&PlayerContext>,
    ) -> Option<String> {
        let Transition { state, dialogue } = self.state.transition(kind, ctx, self.lang);
        debug!(
            action = %kind,
            sync_rate = state.sync_rate(),
            corruption = state.corruption(),
            energy = state.energy(),
            "action applied"
        );
        self.commit(state);
        dialogue
    }

    pub(crate) fn set_sync_rate(&mut self, v: i32) {
        self.commit(self.state.with_sync_rate(v));
    }

    pub(crate) fn set_corruption(&mut self, v: i32) {
        self.commit(self.state.with_corruption(v));
    }

    pub(crate) fn set_energy(&mut self, v: i32) {
        self.commit(self.state.with_energy(v));
    }

    pub(crate) fn reset(&mut self) {
        info!("game state reset");
        self.commit(GameState::default());
    }

    /// Overrides the language for this session without persisting it.
    pub(crate) fn use_language(&mut self, lang: Language) {
        self.lang = lang;
    }

    pub(crate) fn set_language(&mut self, lang: Language) {
        self.lang = lang;
        if let Err(e) = save_json(self.store.as_ref(), LANGUAGE_KEY, &lang) {
            warn!(error = %e, "failed to save language");
        }
    }

    fn commit(&mut self, next: GameState) {
        let prev: Stage = self.state.stage();
        self.state = next;
        if prev != next.stage() {
            info!(from = prev.as_str(), to = next.stage().as_str(), "stage changed");
        }
        self.persist();
    }

    fn persist(&self) {
        // In-memory state stays authoritative when the write fails.
        if let Err(e) = save_json(self.store.as_ref(), GAME_STATE_KEY, &self.state.to_record()) {
            warn!(error = %e, "failed to save game state");
        }
    }
}
