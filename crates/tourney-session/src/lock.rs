//! Reader/writer lock guarding the session state.
//!
//! Built from two Tokio mutexes and a reader counter:
//!
//! - `writer` is held by a writer for its whole critical section, or by
//!   the current *reader generation* as a whole.
//! - The first reader of a generation takes `writer` on behalf of every
//!   reader; the last one to leave releases it.
//! - `entry` serializes reader arrivals so two "first readers" can never
//!   race for `writer`.
//!
//! There is no fairness between readers and writers. A writer queued
//! behind an active generation waits until that generation drains, and
//! readers arriving meanwhile still join the generation. A steady stream
//! of readers can therefore starve a writer, and a queued writer never
//! overtakes readers that already joined. The only guarantee is safety:
//! a writer never overlaps another writer or any reader.
//!
//! Acquisition is not reentrant. A task that holds either side and asks
//! for the write side again deadlocks.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct ReaderGeneration {
    count: usize,
    hold: Option<OwnedMutexGuard<()>>,
}

/// Many-readers/one-writer lock with scoped guards.
///
/// Guards release on drop, so a handler that returns early or errors
/// never leaves the lock held.
#[derive(Debug)]
pub struct SessionLock<T> {
    writer: Arc<Mutex<()>>,
    entry: Mutex<()>,
    generation: StdMutex<ReaderGeneration>,
    cell: RwLock<T>,
}

impl<T> SessionLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            writer: Arc::new(Mutex::new(())),
            entry: Mutex::new(()),
            generation: StdMutex::new(ReaderGeneration::default()),
            cell: RwLock::new(value),
        }
    }

    fn generation(&self) -> StdMutexGuard<'_, ReaderGeneration> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acquires the read side. Waits only if a writer holds the lock and
    /// no reader generation is active.
    pub async fn read(&self) -> ReadGuard<'_, T> {
        let membership = {
            let _entry = self.entry.lock().await;
            let joined = {
                let mut generation = self.generation();
                if generation.count > 0 {
                    generation.count += 1;
                    true
                } else {
                    false
                }
            };
            if !joined {
                let hold = self.writer.clone().lock_owned().await;
                let mut generation = self.generation();
                generation.count = 1;
                generation.hold = Some(hold);
            }
            Membership { lock: &self.generation }
        };
        // Writers are excluded by the generation, so this never waits
        // on a writer.
        let data = self.cell.read().await;
        ReadGuard {
            data,
            _membership: membership,
        }
    }

    /// Acquires the write side, waiting for any active writer or reader
    /// generation to finish.
    pub async fn write(&self) -> WriteGuard<'_, T> {
        let exclusive = self.writer.clone().lock_owned().await;
        let data = self.cell.write().await;
        WriteGuard {
            data,
            _exclusive: exclusive,
        }
    }

    /// Number of readers in the current generation.
    pub fn readers(&self) -> usize {
        self.generation().count
    }

    /// `true` while a writer or a reader generation holds the lock.
    pub fn is_locked(&self) -> bool {
        self.writer.try_lock().is_err()
    }

    pub fn into_inner(self) -> T {
        self.cell.into_inner()
    }
}

impl<T: Default> Default for SessionLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// One reader's registration in the generation. Leaving the last
/// membership releases the writer mutex.
#[derive(Debug)]
struct Membership<'a> {
    lock: &'a StdMutex<ReaderGeneration>,
}

impl Drop for Membership<'_> {
    fn drop(&mut self) {
        let released = {
            let mut generation = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            generation.count = generation.count.saturating_sub(1);
            if generation.count == 0 {
                generation.hold.take()
            } else {
                None
            }
        };
        drop(released);
    }
}

/// Shared access to the guarded value.
#[derive(Debug)]
pub struct ReadGuard<'a, T> {
    data: RwLockReadGuard<'a, T>,
    _membership: Membership<'a>,
}

impl<T> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

/// Exclusive access to the guarded value.
#[derive(Debug)]
pub struct WriteGuard<'a, T> {
    data: RwLockWriteGuard<'a, T>,
    _exclusive: OwnedMutexGuard<()>,
}

impl<T> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readers_share_one_generation() {
        let lock = SessionLock::new(5);
        let a = lock.read().await;
        let b = lock.read().await;
        assert_eq!(*a + *b, 10);
        assert_eq!(lock.readers(), 2);
        assert!(lock.is_locked());
        drop(a);
        assert!(lock.is_locked());
        drop(b);
        assert_eq!(lock.readers(), 0);
        assert!(!lock.is_locked());
    }

    #[tokio::test]
    async fn test_write_guard_mutates_and_releases() {
        let lock = SessionLock::new(Vec::new());
        {
            let mut guard = lock.write().await;
            guard.push(1);
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
        assert_eq!(*lock.read().await, vec![1]);
    }

    #[tokio::test]
    async fn test_read_waits_for_writer() {
        let lock = Arc::new(SessionLock::new(0));
        let mut guard = lock.write().await;

        let reader = {
            let lock = lock.clone();
            tokio::spawn(async move { *lock.read().await })
        };
        tokio::task::yield_now().await;
        assert!(!reader.is_finished());

        *guard = 7;
        drop(guard);
        assert_eq!(reader.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancelled_reader_leaves_lock_usable() {
        let lock = Arc::new(SessionLock::new(0));
        let guard = lock.write().await;
        let pending = {
            let lock = lock.clone();
            tokio::spawn(async move {
                let _ = lock.read().await;
            })
        };
        tokio::task::yield_now().await;
        pending.abort();
        let _ = pending.await;
        drop(guard);

        assert_eq!(lock.readers(), 0);
        *lock.write().await += 1;
        assert_eq!(*lock.read().await, 1);
    }

    #[test]
    fn test_into_inner_returns_value() {
        assert_eq!(SessionLock::new("x").into_inner(), "x");
    }
}
