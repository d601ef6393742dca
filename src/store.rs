//! Store Module
//!
//! The whole-file JSON key-value store.
//!
//! ## Responsibilities
//! - Keep one backing file open for the lifetime of the store
//! - Reload the full file before every operation
//! - Rewrite the full file after every mutation
//! - Serialize all operations through a single lock
//!
//! ## Operation Cycle
//! ```text
//!   lock ──► reload (read file @0) ──► read / stage mutation
//!                                              │
//!                         commit to memory ◄── persist (write @0, truncate, sync)
//!                                │
//!                              unlock
//! ```

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Config, SyncStrategy};
use crate::error::{FlatError, Result};

/// In-memory image of the backing file
type Snapshot = BTreeMap<String, Value>;

/// Embedded key-value store backed by a single pretty-printed JSON file
///
/// ## Concurrency Model: One Critical Section per Operation
///
/// Every public operation takes `state` for its full duration:
/// reload → read or mutate → persist. Two writers can never interleave
/// their reloads, so a write based on a stale view cannot clobber another
/// writer's key.
///
/// ## Failure Model
/// Mutations are staged on a copy of the freshly reloaded mapping. The copy
/// only replaces the in-memory mapping once it has been written, so a failed
/// persist leaves memory equal to the last state read from disk.
pub struct FlatStore {
    /// Store configuration
    config: Config,

    /// File handle and mapping, guarded together
    state: Mutex<State>,
}

struct State {
    file: DataFile,
    data: Snapshot,
}

/// The open backing file
struct DataFile {
    file: File,

    /// Persists since the last fsync (for `EveryNWrites`)
    unsynced_writes: usize,
}

impl FlatStore {
    /// Open or create a store with the given config
    ///
    /// The file is created if missing and loaded immediately, so a corrupt
    /// file is reported here rather than on first use.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&config.path)?;

        let mut state = State {
            file: DataFile {
                file,
                unsynced_writes: 0,
            },
            data: Snapshot::new(),
        };
        state.reload()?;

        tracing::info!(
            path = %config.path.display(),
            keys = state.data.len(),
            "Store opened"
        );

        Ok(Self {
            config,
            state: Mutex::new(state),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().path(path.as_ref()).build();
        Self::open(config)
    }

    // =========================================================================
    // Explicit Reload / Persist
    // =========================================================================

    /// Re-read the whole file and replace the in-memory mapping
    ///
    /// On failure the previous mapping is kept.
    pub fn reload(&self) -> Result<()> {
        self.state.lock().reload()
    }

    /// Write the current in-memory mapping to the file as-is
    pub fn persist(&self) -> Result<()> {
        let mut state = self.state.lock();
        let State { file, data } = &mut *state;
        file.write(data, self.config.sync_strategy)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value stored under `key`, decoded as `T`
    ///
    /// Returns `KeyNotFound` if the key is absent and `Decode` if the stored
    /// value does not fit `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let mut state = self.state.lock();
        state.reload()?;

        let value = state
            .data
            .get(key)
            .ok_or_else(|| FlatError::KeyNotFound(key.to_string()))?;

        T::deserialize(value).map_err(FlatError::Decode)
    }

    /// Get every entry, decoded as one container `T`
    ///
    /// `T` sees the mapping as a JSON object, so any map type with string
    /// keys works, as does a struct whose fields are the stored keys.
    pub fn get_all<T: DeserializeOwned>(&self) -> Result<T> {
        let mut state = self.state.lock();
        state.reload()?;

        let object: serde_json::Map<String, Value> = state
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        T::deserialize(Value::Object(object)).map_err(FlatError::Decode)
    }

    /// Check whether `key` is present
    ///
    /// A reload failure is reported as `false` (and logged). Use
    /// [`FlatStore::try_exists`] to tell the two apart.
    pub fn exists(&self, key: &str) -> bool {
        match self.try_exists(key) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key, error = %e, "exists: store unreadable, reporting absent");
                false
            }
        }
    }

    /// Check whether `key` is present, propagating reload errors
    pub fn try_exists(&self, key: &str) -> Result<bool> {
        let mut state = self.state.lock();
        state.reload()?;
        Ok(state.data.contains_key(key))
    }

    /// All keys currently stored
    ///
    /// Callers must not depend on the order. A reload failure yields an
    /// empty list (and is logged); see [`FlatStore::try_keys`].
    pub fn keys(&self) -> Vec<String> {
        match self.try_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "keys: store unreadable, reporting empty");
                Vec::new()
            }
        }
    }

    /// All keys currently stored, propagating reload errors
    pub fn try_keys(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.reload()?;
        Ok(state.data.keys().cloned().collect())
    }

    /// Number of keys (0 if the store is unreadable)
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert or overwrite `key`
    ///
    /// Steps:
    /// 1. Encode the value
    /// 2. Reload
    /// 3. Stage the insert and persist the staged mapping
    /// 4. Commit the staged mapping to memory
    pub fn set<V: Serialize + ?Sized>(&self, key: impl Into<String>, value: &V) -> Result<()> {
        let value = serde_json::to_value(value).map_err(FlatError::Encode)?;
        let key = key.into();

        self.mutate(|data| {
            tracing::debug!(key = %key, "set");
            data.insert(key, value);
        })
    }

    /// Remove `key`
    ///
    /// Removing an absent key is not an error; the file is rewritten either way.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.mutate(|data| {
            let existed = data.remove(key).is_some();
            tracing::debug!(key, existed, "delete");
        })
    }

    /// Read-modify-write a single key in one critical section
    ///
    /// `f` receives the current value (or `None`) and returns the value to
    /// store, which is also returned to the caller. `f` runs under the store
    /// lock and must not call back into this store.
    pub fn update<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let mut state = self.state.lock();
        state.reload()?;

        let current = state
            .data
            .get(key)
            .map(|value| T::deserialize(value))
            .transpose()
            .map_err(FlatError::Decode)?;

        let next = f(current);
        let encoded = serde_json::to_value(&next).map_err(FlatError::Encode)?;

        let mut staged = state.data.clone();
        staged.insert(key.to_string(), encoded);
        state.commit(staged, self.config.sync_strategy)?;

        Ok(next)
    }

    /// Close the store gracefully
    ///
    /// Syncs the file to disk regardless of the sync strategy
    pub fn close(self) -> Result<()> {
        let state = self.state.into_inner();
        state.file.file.sync_all()?;
        tracing::info!(path = %self.config.path.display(), "Store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Reload, apply `f` to a staged copy, persist, commit
    fn mutate<F: FnOnce(&mut Snapshot)>(&self, f: F) -> Result<()> {
        let mut state = self.state.lock();
        state.reload()?;

        let mut staged = state.data.clone();
        f(&mut staged);

        state.commit(staged, self.config.sync_strategy)
    }
}

impl State {
    /// Replace the mapping with the file contents; untouched on error
    fn reload(&mut self) -> Result<()> {
        self.data = self.file.read()?;
        Ok(())
    }

    /// Persist `staged`, then make it the in-memory mapping
    fn commit(&mut self, staged: Snapshot, strategy: SyncStrategy) -> Result<()> {
        self.file.write(&staged, strategy)?;
        self.data = staged;
        Ok(())
    }
}

impl DataFile {
    /// Read and decode the whole file
    ///
    /// An empty or whitespace-only file decodes to an empty mapping. Only
    /// JSON whitespace counts; a form feed is still a decode error.
    fn read(&mut self) -> Result<Snapshot> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        self.file.read_to_end(&mut buf)?;

        if buf.iter().all(|&b| matches!(b, b' ' | b'\n' | b'\r' | b'\t')) {
            tracing::trace!("reload: empty file");
            return Ok(Snapshot::new());
        }

        let mut de = serde_json::Deserializer::from_slice(&buf);
        let data = Snapshot::deserialize(&mut de).map_err(FlatError::Decode)?;
        de.end().map_err(FlatError::Decode)?;

        tracing::trace!(bytes = buf.len(), keys = data.len(), "reload");
        Ok(data)
    }

    /// Serialize `data`, write it at offset 0 and cut the file to length
    fn write(&mut self, data: &Snapshot, strategy: SyncStrategy) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(data).map_err(FlatError::Encode)?;

        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.set_len(bytes.len() as u64)?;
        self.sync(strategy)?;

        tracing::debug!(bytes = bytes.len(), keys = data.len(), "persist");
        Ok(())
    }

    fn sync(&mut self, strategy: SyncStrategy) -> Result<()> {
        match strategy {
            SyncStrategy::EveryWrite => self.file.sync_data()?,
            SyncStrategy::EveryNWrites { count } => {
                self.unsynced_writes += 1;
                if self.unsynced_writes >= count {
                    self.file.sync_data()?;
                    self.unsynced_writes = 0;
                }
            }
            SyncStrategy::OsManaged => {}
        }
        Ok(())
    }
}
