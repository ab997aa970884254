//! Roster stores: where the participant ids survive restarts.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
#[cfg(feature = "memory")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "memory")]
use std::sync::{Mutex, PoisonError};

use tourney_protocol::{Codec, JsonCodec, MemberId};

use crate::{PlatformError, RosterStore};

/// Keeps the roster in process memory only.
#[cfg(feature = "memory")]
#[derive(Debug, Default)]
pub struct MemoryRoster {
    ids: Mutex<BTreeSet<MemberId>>,
    fail_writes: AtomicBool,
}

#[cfg(feature = "memory")]
impl MemoryRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-filled with `ids`, as if left over from a previous run.
    pub fn with_members(ids: impl IntoIterator<Item = MemberId>) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every later `put`/`delete`/`clear` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, member: MemberId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&member)
    }

    fn write(&self, apply: impl FnOnce(&mut BTreeSet<MemberId>)) -> Result<(), PlatformError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable);
        }
        apply(&mut self.ids.lock().unwrap_or_else(PoisonError::into_inner));
        Ok(())
    }
}

#[cfg(feature = "memory")]
impl RosterStore for MemoryRoster {
    async fn put(&self, member: MemberId) -> Result<(), PlatformError> {
        self.write(|ids| {
            ids.insert(member);
        })
    }

    async fn delete(&self, member: MemberId) -> Result<(), PlatformError> {
        self.write(|ids| {
            ids.remove(&member);
        })
    }

    async fn list(&self) -> Result<Vec<MemberId>, PlatformError> {
        let ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(ids.iter().copied().collect())
    }

    async fn clear(&self) -> Result<(), PlatformError> {
        self.write(BTreeSet::clear)
    }
}

/// Persists the roster as a JSON array of ids in a single file.
///
/// Every write rewrites the whole file through a temporary sibling and
/// a rename. Writes are serialized by an internal async mutex.
#[derive(Debug)]
pub struct JsonFileRoster {
    path: PathBuf,
    codec: JsonCodec,
    gate: tokio::sync::Mutex<()>,
}

impl JsonFileRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            codec: JsonCodec,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeSet<MemberId>, PlatformError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeSet::new()),
            Ok(bytes) => Ok(self.codec.decode(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, ids: &BTreeSet<MemberId>) -> Result<(), PlatformError> {
        let bytes = self.codec.encode(ids)?;
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    async fn update(&self, apply: impl FnOnce(&mut BTreeSet<MemberId>) -> bool) -> Result<(), PlatformError> {
        let _gate = self.gate.lock().await;
        let mut ids = self.load().await?;
        if apply(&mut ids) {
            self.store(&ids).await?;
            tracing::debug!(path = %self.path.display(), size = ids.len(), "roster saved");
        }
        Ok(())
    }
}

impl RosterStore for JsonFileRoster {
    async fn put(&self, member: MemberId) -> Result<(), PlatformError> {
        self.update(|ids| ids.insert(member)).await
    }

    async fn delete(&self, member: MemberId) -> Result<(), PlatformError> {
        self.update(|ids| ids.remove(&member)).await
    }

    async fn list(&self) -> Result<Vec<MemberId>, PlatformError> {
        let _gate = self.gate.lock().await;
        Ok(self.load().await?.into_iter().collect())
    }

    async fn clear(&self) -> Result<(), PlatformError> {
        self.update(|ids| {
            let changed = !ids.is_empty();
            ids.clear();
            changed
        })
        .await
    }
}
