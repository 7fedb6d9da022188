//! Synchronization helpers
//!
//! - [`latest`]: a single-slot channel where an unconsumed value is replaced
//!   by the next one instead of queuing behind it.
//! - Lock helpers that recover from poisoning. A panic on one side of a lock
//!   must not take the console down with it.

use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crossbeam_channel::{bounded, Receiver, SendError, Sender, TrySendError};

/// Sending half of a latest-wins single-slot channel
#[derive(Debug)]
pub struct LatestSender<T> {
    tx: Sender<T>,
    stale: Receiver<T>,
}

/// Create a latest-wins channel with room for exactly one pending value
pub fn latest<T>() -> (LatestSender<T>, Receiver<T>) {
    let (tx, rx) = bounded(1);
    (
        LatestSender {
            tx,
            stale: rx.clone(),
        },
        rx,
    )
}

impl<T> LatestSender<T> {
    /// Publish a value, evicting the pending one if it was not consumed
    pub fn send(&self, mut value: T) -> Result<(), SendError<T>> {
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(v)) => {
                    let _ = self.stale.try_recv();
                    value = v;
                }
                Err(TrySendError::Disconnected(v)) => return Err(SendError(v)),
            }
        }
    }
}

pub fn rwlock_read_or_recover<T: ?Sized>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering from poisoned rwlock (read)");
        poisoned.into_inner()
    })
}

pub fn rwlock_write_or_recover<T: ?Sized>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering from poisoned rwlock (write)");
        poisoned.into_inner()
    })
}

pub fn mutex_lock_or_recover<T: ?Sized>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("recovering from poisoned mutex");
        poisoned.into_inner()
    })
}
