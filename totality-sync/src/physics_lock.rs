use std::ops::{Deref, DerefMut};

use cb::sync::{ShardedLock, ShardedLockReadGuard, ShardedLockWriteGuard};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::{SyncError, SyncResult};

/// Read/write lock around the physics stage.
///
/// Overlap tests and property reads take `read`. Anything that creates, destroys, freezes
/// or rewires bodies and joints takes `write`. Reads are sharded, so many readers are cheap.
pub struct PhysicsLock<T> {
    inner: ShardedLock<T>,
}

impl<T> PhysicsLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ShardedLock::new(value),
        }
    }

    pub fn read(&self) -> SyncResult<PhysicsRead<'_, T>> {
        trace!("Acquiring physics read lock.");
        self.inner
            .read()
            .map(|guard| PhysicsRead { guard })
            .map_err(|_| SyncError::Poisoned("physics"))
    }

    pub fn write(&self) -> SyncResult<PhysicsWrite<'_, T>> {
        trace!("Acquiring physics write lock.");
        self.inner
            .write()
            .map(|guard| PhysicsWrite { guard })
            .map_err(|_| SyncError::Poisoned("physics"))
    }

    pub fn get_mut(&mut self) -> SyncResult<&mut T> {
        self.inner.get_mut().map_err(|_| SyncError::Poisoned("physics"))
    }

    pub fn into_inner(self) -> SyncResult<T> {
        self.inner.into_inner().map_err(|_| SyncError::Poisoned("physics"))
    }
}

pub struct PhysicsRead<'a, T> {
    guard: ShardedLockReadGuard<'a, T>,
}
impl<'a, T> Deref for PhysicsRead<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}
impl<'a, T> Drop for PhysicsRead<'a, T> {
    fn drop(&mut self) {
        trace!("Releasing physics read lock.");
    }
}

pub struct PhysicsWrite<'a, T> {
    guard: ShardedLockWriteGuard<'a, T>,
}
impl<'a, T> Deref for PhysicsWrite<'a, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}
impl<'a, T> DerefMut for PhysicsWrite<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
impl<'a, T> Drop for PhysicsWrite<'a, T> {
    fn drop(&mut self) {
        trace!("Releasing physics write lock.");
    }
}
