//! State persistence.
//!
//! The whole `AppState` is written through to a single key-value slot
//! after every mutation; per-identity profile slots let a returning
//! user resume without the aggregate blob. Backends are injectable so
//! tests can run against memory instead of disk.

use crate::state::{AppState, UserProfile};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage key for the aggregate state blob.
pub const STATE_KEY: &str = "fynix_state";

/// Prefix for per-identity profile keys.
pub const PROFILE_KEY_PREFIX: &str = "fynix_user_";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A durable key -> JSON string slot store.
///
/// Writes must replace the slot atomically as a whole: a crash between
/// a state transition and its write may lose that one transition, but
/// must never corrupt a prior snapshot.
pub trait StorageBackend: Send {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
}

// ============================================================================
// Backends
// ============================================================================

/// File-backed storage: one JSON file per key under a base directory.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the given directory, creating it if
    /// needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, PersistError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        // Write to a temp file in the same directory, then rename over
        // the slot so readers only ever see a complete blob.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory storage for tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.slots.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Load the aggregate state.
///
/// An absent or unparsable blob is treated as a fresh install and
/// yields the default state; this is never fatal to startup. Missing
/// fields in an old blob are backfilled by the serde defaults on
/// [`AppState`].
pub fn load_state(backend: &dyn StorageBackend) -> AppState {
    let raw = match backend.read(STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return AppState::default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read saved state, starting fresh");
            return AppState::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(error = %e, "saved state is unparsable, starting fresh");
            AppState::default()
        }
    }
}

/// Write the full aggregate state to its slot.
pub fn save_state(backend: &mut dyn StorageBackend, state: &AppState) -> Result<(), PersistError> {
    let content = serde_json::to_string(state)?;
    backend.write(STATE_KEY, &content)
}

/// The storage key for a per-identity profile.
pub fn profile_key(email: &str) -> String {
    format!("{PROFILE_KEY_PREFIX}{email}")
}

/// Load a per-identity profile, if one was saved for this email.
/// Missing fields are backfilled from the default profile.
pub fn load_profile(backend: &dyn StorageBackend, email: &str) -> Option<UserProfile> {
    let raw = backend.read(&profile_key(email)).ok()??;
    match serde_json::from_str(&raw) {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(error = %e, "saved profile is unparsable, ignoring");
            None
        }
    }
}

/// Write a profile under its identity key.
pub fn save_profile(
    backend: &mut dyn StorageBackend,
    profile: &UserProfile,
) -> Result<(), PersistError> {
    let content = serde_json::to_string(profile)?;
    backend.write(&profile_key(&profile.email), &content)
}
